//! Core functionality for actual scanning behaviour.
//!
//! Work is issued in waves: a bounded batch of probes (or, when sweeping,
//! of whole host scans) is launched and fully drained before the next batch
//! starts. Nothing runs ahead of a wave, so the number of sockets open at any
//! time never exceeds `concurrency`, or `concurrency * batch_size` for a sweep.
use crate::address::AddressSpace;
use crate::input::PortSet;
use futures::future::join_all;
use log::{debug, warn};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

mod connector;
pub use connector::{Connector, ProbeOutcome, TcpConnector};

/// The class for the scanner
/// ports is the ascending list of ports probed on every host
/// concurrency is how many ports of one host are probed at a time
/// connector performs the individual probes
#[derive(Debug)]
pub struct Scanner<C = TcpConnector> {
    ports: Box<[u16]>,
    concurrency: NonZeroUsize,
    connector: C,
}

impl Scanner<TcpConnector> {
    /// A scanner doing real TCP connects with the given per-probe `timeout`.
    pub fn new(ports: &PortSet, timeout: Duration, concurrency: NonZeroUsize) -> Self {
        Self::with_connector(ports, concurrency, TcpConnector::new(timeout))
    }
}

impl<C: Connector> Scanner<C> {
    /// A scanner delegating every probe to `connector`.
    pub fn with_connector(ports: &PortSet, concurrency: NonZeroUsize, connector: C) -> Self {
        Self {
            ports: ports.iter().copied().collect(),
            concurrency,
            connector,
        }
    }

    /// The connector probes are delegated to.
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Probes every port on `ip`, `concurrency` ports per wave.
    ///
    /// Returns once every probe has completed, with the open sockets in
    /// ascending port order.
    pub async fn scan_host(&self, ip: Ipv4Addr) -> Vec<SocketAddrV4> {
        let mut open_sockets = Vec::new();

        for wave in self.ports.chunks(self.concurrency.get()) {
            let probes = wave
                .iter()
                .map(|&port| self.connector.probe(SocketAddrV4::new(ip, port)));
            let outcomes = join_all(probes).await;

            open_sockets.extend(
                wave.iter()
                    .zip(outcomes)
                    .filter(|(_, outcome)| outcome.is_open())
                    .map(|(&port, _)| SocketAddrV4::new(ip, port)),
            );
        }

        open_sockets
    }
}

impl<C: Connector + 'static> Scanner<C> {
    /// Scans every address of `space`, `batch_size` hosts per wave.
    ///
    /// Each host of a wave runs [`Scanner::scan_host`] on its own task, and
    /// the next wave starts only after all of them finished. Returns the
    /// number of open ports found.
    pub async fn sweep(self: Arc<Self>, space: AddressSpace, batch_size: NonZeroU32) -> usize {
        let wave_count = space.wave_count(batch_size);
        debug!(
            "Start sweeping.\nBatch size {batch_size}\nNumber of ips {}\nNumber of ports {}\nNumber of waves {wave_count}",
            space.address_count(),
            self.ports.len()
        );

        let mut found = 0;
        for (index, wave) in space.waves(batch_size).enumerate() {
            let mut hosts = JoinSet::new();
            for ip in wave {
                let scanner = Arc::clone(&self);
                hosts.spawn(async move { scanner.scan_host(ip).await.len() });
            }

            while let Some(result) = hosts.join_next().await {
                match result {
                    Ok(open) => found += open,
                    Err(e) => warn!("Host scan task failed: {e}"),
                }
            }
            debug!("Wave {}/{wave_count} done, {found} open ports so far", index + 1);
        }

        found
    }
}
