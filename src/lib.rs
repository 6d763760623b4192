//! This crate exposes the internal functionality of the `wavescan` TCP
//! connect scanner.
//!
//! ## Architecture Overview
//!
//! The core scanning behaviour is managed by
//! [`Scanner`](crate::scanner::Scanner), which probes a canonical
//! [`PortSet`](crate::input::PortSet) through a
//! [`Connector`](crate::scanner::Connector). The scanning process follows
//! this flow:
//!
//! 1. **Input Processing**: the target and the port specification are parsed
//! 2. **Host Scan**: ports of one host are probed in waves of at most
//!    `concurrency` connections
//! 3. **Sweep**: with `ALL`, the [`AddressSpace`](crate::address::AddressSpace)
//!    is cut into waves of `batch_size` hosts, each host scanned on its own task
//! 4. **Reporting**: every open port is printed as soon as it is found
//!
//! A wave is always fully drained before the next one starts, which bounds
//! the number of sockets open at once.
//!
//! ## Basic Usage Example
//!
//! ```rust
//! use std::{net::Ipv4Addr, num::NonZeroUsize, time::Duration};
//!
//! use wavescan::input::parse_ports;
//! use wavescan::scanner::Scanner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ports = parse_ports("1-1000")?;
//!     let scanner = Scanner::new(
//!         &ports,
//!         Duration::from_secs(1),
//!         NonZeroUsize::new(100).unwrap(),
//!     );
//!
//!     let open = scanner.scan_host(Ipv4Addr::LOCALHOST).await;
//!     println!("Discovered {} open ports", open.len());
//!     Ok(())
//! }
//! ```
#![allow(clippy::needless_doctest_main)]
#![warn(missing_docs)]

pub mod tui;

pub mod input;

pub mod scanner;

pub mod address;

pub mod ulimit;
