#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown, clippy::if_not_else)]

use anyhow::{ensure, Context};
use clap::Parser;
use log::debug;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use wavescan::address::AddressSpace;
use wavescan::input::{parse_ports, Opts, Target};
use wavescan::scanner::Scanner;
use wavescan::warning;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            // --help and --version also end up here, on stdout.
            let usage_error = e.use_stderr();
            if let Err(print_error) = e.print() {
                debug!("Could not print usage: {print_error}");
            }
            return if usage_error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    debug!("Main() `opts` arguments are {opts:?}");

    match run(&opts).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            warning!(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(opts: &Opts) -> anyhow::Result<()> {
    let ports = parse_ports(&opts.ports).context("Could not parse port specification")?;
    ensure!(!ports.is_empty(), "No valid ports specified.");
    debug!("Scanning {} ports on {}", ports.len(), opts.target);

    #[cfg(unix)]
    wavescan::ulimit::adjust_ulimit_size(opts, &wavescan::ulimit::Nofile);

    let scanner = Scanner::new(&ports, opts.timeout(), opts.concurrency);

    let start = Instant::now();
    match opts.target {
        Target::Host(ip) => {
            scanner.scan_host(ip).await;
        }
        Target::All => {
            let found = Arc::new(scanner)
                .sweep(AddressSpace::full(), opts.batch_size)
                .await;
            debug!("Sweep found {found} open ports");
        }
    }

    println!(
        "Scan completed in {} seconds.",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
