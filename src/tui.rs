//! Utilities for terminal output during scanning.
//!
//! Everything printed through these macros goes to standard error, keeping
//! standard output for scan results only.

/// Prints a red `[!]` line to stderr. Used for errors and for conditions
/// the user should act on.
#[macro_export]
macro_rules! warning {
    ($name:expr) => {{
        eprintln!(
            "{} {}",
            ::colored::Colorize::bold(::colored::Colorize::red("[!]")),
            $name
        );
    }};
}

/// Prints a blue `[~]` line to stderr with extra information about the run.
#[macro_export]
macro_rules! detail {
    ($name:expr) => {{
        eprintln!(
            "{} {}",
            ::colored::Colorize::bold(::colored::Colorize::blue("[~]")),
            $name
        );
    }};
}
