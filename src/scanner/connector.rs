//! Single-port probing: one TCP connect attempt bounded by a timeout.
use async_trait::async_trait;
use log::debug;
use std::io::{self, ErrorKind};
use std::net::SocketAddrV4;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpSocket;
use tokio::time;

/// Result of probing one address and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The connection was accepted.
    Open,
    /// The peer refused the connection.
    Closed,
    /// Nothing answered before the timeout.
    TimedOut,
    /// The socket could not be created or the connect failed otherwise.
    Failed(ErrorKind),
}

impl ProbeOutcome {
    /// Only open ports are reported.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Something that can probe a single socket address.
///
/// Implementations must be safe to call concurrently for different
/// targets and must release whatever they acquire before returning.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Probes `target` once and classifies the outcome.
    async fn probe(&self, target: SocketAddrV4) -> ProbeOutcome;
}

/// Probes with a real TCP connect and prints every open port to stdout.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    timeout: Duration,
}

impl TcpConnector {
    /// A connector giving every attempt `timeout` to complete.
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Performs the connection to the socket with timeout.
    ///
    /// The socket is owned by this future, so it is closed on every path,
    /// including when the timeout drops the pending connect.
    async fn connect(&self, target: SocketAddrV4) -> ProbeOutcome {
        let socket = match TcpSocket::new_v4() {
            Ok(socket) => socket,
            Err(e) => {
                debug!("Could not create socket for {target}: {e}");
                return ProbeOutcome::Failed(e.kind());
            }
        };

        match time::timeout(self.timeout, socket.connect(target.into())).await {
            Ok(Ok(tcp_stream)) => {
                debug!("Connection was successful, shutting down stream {target}");
                if let Err(e) = { tcp_stream }.shutdown().await {
                    debug!("Shutdown stream error {e}");
                }
                ProbeOutcome::Open
            }
            Ok(Err(e)) => classify(&e),
            Err(_) => ProbeOutcome::TimedOut,
        }
    }
}

fn classify(error: &io::Error) -> ProbeOutcome {
    match error.kind() {
        ErrorKind::ConnectionRefused => ProbeOutcome::Closed,
        kind => ProbeOutcome::Failed(kind),
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn probe(&self, target: SocketAddrV4) -> ProbeOutcome {
        let outcome = self.connect(target).await;
        if outcome.is_open() {
            println!("Port {} is open on {}", target.port(), target.ip());
        } else {
            debug!("{target} is {outcome:?}");
        }
        outcome
    }
}
