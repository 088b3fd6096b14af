//! Unique IP allocation for control plane endpoints
//!
//! Two strategies hand out endpoint addresses:
//!
//! - **Pool**: pop from the shared list in `T_CLUSTER_IP_POOL`. Safe across
//!   concurrent harnesses in one process.
//! - **Probe**: scan the host addresses of a CIDR block in ascending order and
//!   return the first one nothing answers on.
//!
//! Probing is check-then-use: two processes scanning the same block can pick
//! the same address. CI that runs tests in parallel should set a pool.

mod pool;
mod probe;

pub use pool::IpPool;
pub use probe::{ReachabilityProbe, TcpProbe, DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT};

#[cfg(test)]
pub use probe::MockReachabilityProbe;

use std::net::Ipv4Addr;
use std::sync::Arc;

use ipnet::Ipv4Net;
use tracing::{debug, info};

use crate::env::{EnvConfig, CLUSTER_IP_POOL_VAR};
use crate::{Error, Result};

/// How an [`IpAllocator`] finds addresses
#[derive(Clone)]
pub enum AllocationStrategy {
    /// Pop from a shared pool
    Pool(Arc<IpPool>),
    /// Scan a CIDR block with a reachability probe
    Probe(Arc<dyn ReachabilityProbe>),
}

/// Hands out one control plane endpoint address per call
#[derive(Clone)]
pub struct IpAllocator {
    strategy: AllocationStrategy,
}

impl IpAllocator {
    /// Allocate from `pool`
    pub fn pool(pool: Arc<IpPool>) -> Self {
        Self {
            strategy: AllocationStrategy::Pool(pool),
        }
    }

    /// Allocate by probing with `probe`
    pub fn probe(probe: Arc<dyn ReachabilityProbe>) -> Self {
        Self {
            strategy: AllocationStrategy::Probe(probe),
        }
    }

    /// Use the shared pool when `T_CLUSTER_IP_POOL` is set, `probe` otherwise.
    pub fn from_env(env: &EnvConfig, probe: Arc<dyn ReachabilityProbe>) -> Result<Self> {
        Ok(match IpPool::shared(env, CLUSTER_IP_POOL_VAR)? {
            Some(pool) => Self::pool(pool),
            None => Self::probe(probe),
        })
    }

    /// Active strategy
    pub fn strategy(&self) -> &AllocationStrategy {
        &self.strategy
    }

    /// Allocate an address. `cidr` is only read in probe mode.
    pub async fn allocate(&self, cidr: &str) -> Result<Ipv4Addr> {
        match &self.strategy {
            AllocationStrategy::Pool(pool) => pool.pop(),
            AllocationStrategy::Probe(probe) => find_free_address(probe.as_ref(), cidr).await,
        }
    }
}

/// Return the lowest host address in `cidr` that `probe` reports as free.
///
/// Network and broadcast addresses are never candidates. A probe error aborts
/// the scan.
pub async fn find_free_address<P>(probe: &P, cidr: &str) -> Result<Ipv4Addr>
where
    P: ReachabilityProbe + ?Sized,
{
    let network: Ipv4Net = cidr.trim().parse().map_err(|e: ipnet::AddrParseError| {
        Error::InvalidCidr {
            cidr: cidr.to_string(),
            message: e.to_string(),
        }
    })?;

    for candidate in network.trunc().hosts() {
        if probe.is_in_use(candidate).await? {
            debug!(address = %candidate, "Address in use, trying next");
            continue;
        }
        info!(cidr = %network, address = %candidate, "Found free address");
        return Ok(candidate);
    }

    Err(Error::ProbeExhausted {
        cidr: cidr.to_string(),
    })
}
