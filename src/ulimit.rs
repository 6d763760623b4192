//! Keeps the open file limit in line with the sockets a scan holds at once.
use crate::input::Opts;
use crate::{detail, warning};
use log::debug;
use std::io;

/// Access to the process limit on open file descriptors.
pub trait FileLimit {
    /// Current soft limit.
    fn soft(&self) -> io::Result<u64>;
    /// Sets both the soft and the hard limit to `limit`.
    fn set(&self, limit: u64) -> io::Result<()>;
    /// Raises the soft limit towards `required`, capped by the hard limit.
    /// Returns the soft limit in effect afterwards.
    fn raise_to(&self, required: u64) -> io::Result<u64>;
}

/// The real `RLIMIT_NOFILE` of this process.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Nofile;

#[cfg(unix)]
impl FileLimit for Nofile {
    fn soft(&self) -> io::Result<u64> {
        rlimit::Resource::NOFILE.get().map(|(soft, _)| soft)
    }

    fn set(&self, limit: u64) -> io::Result<()> {
        rlimit::Resource::NOFILE.set(limit, limit)
    }

    fn raise_to(&self, required: u64) -> io::Result<u64> {
        rlimit::increase_nofile_limit(required)
    }
}

/// Where the open file limit ended up relative to what the scan needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStatus {
    /// The limit already covered the scan.
    Sufficient(u64),
    /// The limit was raised far enough.
    Raised(u64),
    /// The limit stays below what the scan may hold at once.
    TooLow {
        /// Soft limit in effect.
        limit: u64,
        /// Descriptors the scan may need.
        required: u64,
    },
    /// The limit could not be read.
    Unknown,
}

/// Applies `--ulimit`, then makes sure the open file limit covers the
/// sockets this run keeps open at once, raising it when possible.
///
/// Never fails: a low limit only costs individual probes, so it is
/// reported and the scan goes ahead.
pub fn adjust_ulimit_size(opts: &Opts, limits: &impl FileLimit) -> LimitStatus {
    if let Some(limit) = opts.ulimit {
        if limits.set(limit).is_ok() {
            detail!(format!("Automatically increasing ulimit value to {limit}."));
        } else {
            warning!("ERROR. Failed to set ulimit value.");
        }
    }

    let required = opts.required_descriptors();
    let soft = match limits.soft() {
        Ok(soft) => soft,
        Err(e) => {
            debug!("Could not read the open file limit: {e}");
            return LimitStatus::Unknown;
        }
    };
    debug!("Open file limit {soft}, scan needs up to {required}");

    if soft >= required {
        return LimitStatus::Sufficient(soft);
    }

    let limit = match limits.raise_to(required) {
        Ok(raised) if raised >= required => {
            debug!("Raised open file limit to {raised}");
            return LimitStatus::Raised(raised);
        }
        Ok(raised) => raised,
        Err(e) => {
            debug!("Could not raise the open file limit: {e}");
            soft
        }
    };

    warning!(format!(
        "The open file limit is {limit} but this scan may hold {required} sockets at once. \
         Lower the batch size or concurrency, or raise it with --ulimit."
    ));
    LimitStatus::TooLow { limit, required }
}

#[cfg(test)]
mod tests {
    use super::{adjust_ulimit_size, FileLimit, LimitStatus};
    use crate::input::Opts;
    use clap::Parser;
    use std::cell::Cell;
    use std::io;

    /// In-memory soft/hard limit pair behaving like `setrlimit` for an
    /// unprivileged process.
    struct FakeLimit {
        soft: Cell<u64>,
        hard: Cell<u64>,
        readable: bool,
    }

    impl FakeLimit {
        fn new(soft: u64, hard: u64) -> Self {
            Self {
                soft: Cell::new(soft),
                hard: Cell::new(hard),
                readable: true,
            }
        }
    }

    impl FileLimit for FakeLimit {
        fn soft(&self) -> io::Result<u64> {
            if self.readable {
                Ok(self.soft.get())
            } else {
                Err(io::Error::other("getrlimit failed"))
            }
        }

        fn set(&self, limit: u64) -> io::Result<()> {
            if limit > self.hard.get() {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            self.soft.set(limit);
            self.hard.set(limit);
            Ok(())
        }

        fn raise_to(&self, required: u64) -> io::Result<u64> {
            self.soft.set(required.min(self.hard.get()));
            Ok(self.soft.get())
        }
    }

    fn opts(args: &[&str]) -> Opts {
        Opts::parse_from(std::iter::once("wavescan").chain(args.iter().copied()))
    }

    #[test]
    fn sufficient_limit_is_left_alone() {
        let limits = FakeLimit::new(1_024, 4_096);

        let status = adjust_ulimit_size(&opts(&["127.0.0.1", "80", "1"]), &limits);

        assert_eq!(status, LimitStatus::Sufficient(1_024));
        assert_eq!(limits.soft.get(), 1_024);
    }

    #[test]
    fn sweep_raises_limit_up_to_requirement() {
        let limits = FakeLimit::new(1_024, 1_048_576);

        let status = adjust_ulimit_size(&opts(&["ALL", "80", "1"]), &limits);

        assert_eq!(status, LimitStatus::Raised(10_000));
        assert_eq!(limits.soft.get(), 10_000);
    }

    #[test]
    fn hard_limit_caps_raise_without_aborting() {
        let limits = FakeLimit::new(256, 4_096);

        let status = adjust_ulimit_size(&opts(&["ALL", "80", "1", "200"]), &limits);

        assert_eq!(
            status,
            LimitStatus::TooLow {
                limit: 4_096,
                required: 20_000
            }
        );
    }

    #[test]
    fn explicit_ulimit_is_applied_first() {
        let limits = FakeLimit::new(1_024, 65_536);

        let status = adjust_ulimit_size(&opts(&["-u", "5000", "127.0.0.1", "80", "1"]), &limits);

        assert_eq!(status, LimitStatus::Sufficient(5_000));
        assert_eq!(limits.hard.get(), 5_000);
    }

    #[test]
    fn explicit_ulimit_below_requirement_is_reported() {
        let limits = FakeLimit::new(1_024, 65_536);

        let status = adjust_ulimit_size(&opts(&["-u", "50", "127.0.0.1", "80", "1"]), &limits);

        assert_eq!(
            status,
            LimitStatus::TooLow {
                limit: 50,
                required: 100
            }
        );
    }

    #[test]
    fn rejected_ulimit_keeps_current_limit() {
        let limits = FakeLimit::new(1_024, 2_048);

        let status = adjust_ulimit_size(&opts(&["-u", "9000", "127.0.0.1", "80", "1"]), &limits);

        assert_eq!(status, LimitStatus::Sufficient(1_024));
        assert_eq!(limits.hard.get(), 2_048);
    }

    #[test]
    fn unreadable_limit_is_unknown() {
        let mut limits = FakeLimit::new(0, 0);
        limits.readable = false;

        let status = adjust_ulimit_size(&opts(&["127.0.0.1", "80", "1"]), &limits);

        assert_eq!(status, LimitStatus::Unknown);
    }
}
