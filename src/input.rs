//! Provides a means to read, parse and hold configuration options for scans.
use clap::{value_parser, Parser};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const LOWEST_PORT_NUMBER: i64 = 1;
const TOP_PORT_NUMBER: i64 = 65535;

/// Keyword selecting the whole IPv4 address space as scan target.
const ALL_ADDRESSES: &str = "ALL";

/// Canonical set of ports to scan. Iteration is always ascending.
pub type PortSet = BTreeSet<u16>;

/// Errors produced while interpreting user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// The target is neither `ALL` nor a dotted-decimal IPv4 address.
    #[error("'{0}' is neither an IPv4 address nor ALL")]
    InvalidTarget(String),
    /// A single-port token is not an integer.
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    /// A range token is not two integers joined by `-`.
    #[error("invalid port range '{0}', expected 'start-end'. Example: 1-1024")]
    InvalidRange(String),
}

/// What a run scans: one host, or every IPv4 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A single address.
    Host(Ipv4Addr),
    /// Every IPv4 address, swept in waves.
    All,
}

impl FromStr for Target {
    type Err = InputError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input == ALL_ADDRESSES {
            return Ok(Self::All);
        }

        input
            .parse::<Ipv4Addr>()
            .map(Self::Host)
            .map_err(|_| InputError::InvalidTarget(input.to_owned()))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(ip) => write!(f, "{ip}"),
            Self::All => f.write_str(ALL_ADDRESSES),
        }
    }
}

/// Parses a port specification such as `22,80,443` or `1-1024,8080`.
///
/// Tokens are separated by commas and may be single ports or inclusive
/// `start-end` ranges. Ports outside `1..=65535` are dropped, as are ranges
/// whose start lies past their end. Text that is not an integer fails the
/// whole parse.
///
/// ```rust
/// # use wavescan::input::parse_ports;
/// let ports = parse_ports("1-3,2,5").unwrap();
/// assert_eq!(ports.into_iter().collect::<Vec<_>>(), vec![1, 2, 3, 5]);
/// ```
pub fn parse_ports(input: &str) -> Result<PortSet, InputError> {
    let mut ports = PortSet::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if part.contains('-') {
            ports.extend(parse_port_range(part)?);
        } else if let Some(port) = in_port_bounds(parse_single_port(part)?) {
            ports.insert(port);
        }
    }

    Ok(ports)
}

fn parse_port_range(range_str: &str) -> Result<impl Iterator<Item = u16>, InputError> {
    let invalid = || InputError::InvalidRange(range_str.to_owned());

    let (start, end) = range_str.split_once('-').ok_or_else(invalid)?;
    let start: i64 = start.trim().parse().map_err(|_| invalid())?;
    let end: i64 = end.trim().parse().map_err(|_| invalid())?;

    // Clip before iterating so `1-9999999999` never walks past the top port.
    let start = start.max(LOWEST_PORT_NUMBER);
    let end = end.min(TOP_PORT_NUMBER);

    Ok((start..=end).filter_map(in_port_bounds))
}

fn parse_single_port(port_str: &str) -> Result<i64, InputError> {
    port_str
        .parse()
        .map_err(|_| InputError::InvalidPort(port_str.to_owned()))
}

fn in_port_bounds(port: i64) -> Option<u16> {
    if (LOWEST_PORT_NUMBER..=TOP_PORT_NUMBER).contains(&port) {
        u16::try_from(port).ok()
    } else {
        None
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "wavescan",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    after_help = "PORTS can be a single port (80), a range (1-1024), or a comma-separated list (22,80,443).",
)]
/// Concurrent TCP connect scanner.
/// WARNING scanning ALL sweeps every IPv4 address, reserved ranges included,
/// and keeps CONCURRENCY * BATCH_SIZE sockets open at once.
pub struct Opts {
    /// IPv4 address to scan, or ALL to sweep the whole IPv4 address space.
    #[arg(value_name = "IP_ADDRESS|ALL")]
    pub target: Target,

    /// A list of ports and/or port ranges to be scanned. Examples: 22,80,443 or 1-1024 or 1-1024,8080
    #[arg(value_name = "PORTS")]
    pub ports: String,

    /// Seconds to wait for each connection before the port is assumed closed.
    #[arg(value_name = "TIMEOUT_IN_SECONDS", value_parser = value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// How many addresses are scanned at the same time when sweeping ALL.
    #[arg(value_name = "BATCH_SIZE", default_value = "100")]
    pub batch_size: NonZeroU32,

    /// Maximum number of port probes in flight for a single host.
    #[arg(short, long, default_value = "100")]
    pub concurrency: NonZeroUsize,

    /// Automatically ups the ULIMIT with the value you provided.
    #[arg(short, long)]
    pub ulimit: Option<u64>,
}

impl Opts {
    /// Per-probe connect timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Upper bound on sockets open at the same time during this run.
    pub const fn required_descriptors(&self) -> u64 {
        let per_host = self.concurrency.get() as u64;
        match self.target {
            Target::Host(_) => per_host,
            Target::All => per_host.saturating_mul(self.batch_size.get() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use parameterized::parameterized;
    use std::net::Ipv4Addr;

    use super::{parse_ports, InputError, Opts, Target};

    #[test]
    fn verify_cli() {
        Opts::command().debug_assert();
    }

    #[test]
    fn opts_defaults() {
        let opts = Opts::parse_from(["wavescan", "127.0.0.1", "22,80", "2"]);

        assert_eq!(opts.target, Target::Host(Ipv4Addr::LOCALHOST));
        assert_eq!(opts.ports, "22,80");
        assert_eq!(opts.timeout().as_secs(), 2);
        assert_eq!(opts.batch_size.get(), 100);
        assert_eq!(opts.concurrency.get(), 100);
        assert_eq!(opts.ulimit, None);
        assert_eq!(opts.required_descriptors(), 100);
    }

    #[test]
    fn opts_all_with_batch_size() {
        let opts = Opts::parse_from(["wavescan", "ALL", "80", "1", "250", "-c", "10"]);

        assert_eq!(opts.target, Target::All);
        assert_eq!(opts.batch_size.get(), 250);
        assert_eq!(opts.required_descriptors(), 2_500);
    }

    #[parameterized(input = {
        vec!["wavescan"],
        vec!["wavescan", "127.0.0.1", "80"],
        vec!["wavescan", "127.0.0.1", "80", "1", "100", "extra"],
        vec!["wavescan", "127.0.0.1", "80", "0"],
        vec!["wavescan", "127.0.0.1", "80", "1", "0"],
        vec!["wavescan", "127.0.0.1", "80", "1", "-c", "0"],
        vec!["wavescan", "127.0.0.1", "80", "soon"],
        vec!["wavescan", "localhost", "80", "1"],
        vec!["wavescan", "all", "80", "1"],
    })]
    fn rejects_bad_invocations(input: Vec<&str>) {
        assert!(Opts::try_parse_from(input).is_err());
    }

    #[test]
    fn target_from_str() {
        assert_eq!("ALL".parse::<Target>(), Ok(Target::All));
        assert_eq!(
            "10.0.0.1".parse::<Target>(),
            Ok(Target::Host(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(
            "256.0.0.1".parse::<Target>(),
            Err(InputError::InvalidTarget("256.0.0.1".to_owned()))
        );
    }

    #[parameterized(input = {
        "80", "1-3", "1-3,2,5", "80, 443, 1-3, 8080", "443,80,443,80", "0,65536,443",
        "0-2", "65534-70000", "5-1", "", ",", " , ,", "1 - 3",
    }, expected = {
        vec![80], vec![1, 2, 3], vec![1, 2, 3, 5], vec![1, 2, 3, 80, 443, 8080], vec![80, 443],
        vec![443], vec![1, 2], vec![65534, 65535], vec![], vec![], vec![], vec![], vec![1, 2, 3],
    })]
    fn parse_valid_port_specs(input: &str, expected: Vec<u16>) {
        let ports = parse_ports(input).unwrap();
        assert_eq!(ports.into_iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn parse_drops_huge_numbers() {
        let ports = parse_ports("99999999999,22,1-99999999999999").unwrap();
        assert_eq!(ports.len(), 65_535);
        assert_eq!(ports.first(), Some(&1));
        assert_eq!(ports.last(), Some(&65_535));
    }

    #[parameterized(input = {
        "abc", "80,abc,443", "8o", "99999999999999999999",
    }, token = {
        "abc", "abc", "8o", "99999999999999999999",
    })]
    fn parse_rejects_malformed_ports(input: &str, token: &str) {
        assert_eq!(
            parse_ports(input),
            Err(InputError::InvalidPort(token.to_owned()))
        );
    }

    #[parameterized(input = {
        "1-abc", "80,x-90", "1-2-3", "-5", "5-", "-",
    }, token = {
        "1-abc", "x-90", "1-2-3", "-5", "5-", "-",
    })]
    fn parse_rejects_malformed_ranges(input: &str, token: &str) {
        assert_eq!(
            parse_ports(input),
            Err(InputError::InvalidRange(token.to_owned()))
        );
    }
}
