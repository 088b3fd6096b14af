//! Network reachability probing

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::net::TcpStream;

use crate::{Error, Result};

/// Port dialed by [`TcpProbe`] unless configured otherwise
pub const DEFAULT_PROBE_PORT: u16 = 80;

/// Per-address connect timeout used by [`TcpProbe`]
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Decides whether an address is already taken on the network.
///
/// This trait abstracts the live network check for testability.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// `true` when something answers at `address`
    async fn is_in_use(&self, address: Ipv4Addr) -> Result<bool>;
}

/// Probe that dials a TCP port on the candidate address.
///
/// An accepted or actively refused connection means a host is there. A timeout
/// or an unreachable host or network means the address is free. Any other
/// failure is reported as a probe error.
#[derive(Clone, Debug)]
pub struct TcpProbe {
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    /// Create a probe for the given port and connect timeout
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn is_in_use(&self, address: Ipv4Addr) -> Result<bool> {
        let target = SocketAddr::from((address, self.port));
        match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
            Err(_elapsed) => Ok(false),
            Ok(Ok(_stream)) => Ok(true),
            Ok(Err(e)) => connect_error_in_use(target, e),
        }
    }
}

/// Map a failed connect to whether something holds the address
fn connect_error_in_use(target: SocketAddr, e: io::Error) -> Result<bool> {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => Ok(true),
        io::ErrorKind::TimedOut
        | io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkUnreachable => Ok(false),
        _ => Err(Error::probe(target, e.to_string())),
    }
}
