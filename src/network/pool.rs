//! Shared pool of pre-allocated endpoint addresses
//!
//! CI hands parallel test processes a comma-separated list of addresses in an
//! environment variable. Within a process every harness built from the same
//! variable and address set draws from one [`IpPool`], and each pop happens
//! under the pool's mutex, so no two callers receive the same address.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::info;

use crate::env::EnvConfig;
use crate::{Error, Result};

/// Process-wide pools keyed by variable and sorted address set
static POOLS: LazyLock<DashMap<String, Arc<IpPool>>> = LazyLock::new(DashMap::new);

/// A bounded, consume-once set of IPv4 addresses
#[derive(Debug)]
pub struct IpPool {
    name: String,
    addresses: Mutex<VecDeque<Ipv4Addr>>,
}

impl IpPool {
    /// Create a pool from explicit addresses
    pub fn new(name: impl Into<String>, addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self {
            name: name.into(),
            addresses: Mutex::new(addresses.into_iter().collect()),
        }
    }

    /// Parse a comma-separated address list. Blank entries and repeats of an
    /// earlier address are ignored.
    pub fn parse(name: &str, list: &str) -> Result<Self> {
        let mut seen = HashSet::new();
        let addresses = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry.parse::<Ipv4Addr>().map_err(|_| Error::InvalidPoolAddress {
                    pool: name.to_string(),
                    address: entry.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(
            name,
            addresses.into_iter().filter(|address| seen.insert(*address)),
        ))
    }

    /// The process-wide pool seeded from `var`, or `None` when the variable is
    /// unset or empty.
    pub fn shared(env: &EnvConfig, var: &str) -> Result<Option<Arc<IpPool>>> {
        let Some(list) = env.get(var) else {
            return Ok(None);
        };

        let parsed = Self::parse(var, list)?;
        let key = parsed.registry_key();
        if let Some(pool) = POOLS.get(&key) {
            return Ok(Some(Arc::clone(pool.value())));
        }

        let pool = POOLS.entry(key).or_insert_with(|| Arc::new(parsed));
        Ok(Some(Arc::clone(pool.value())))
    }

    /// Same key for any spelling or ordering of one address set
    fn registry_key(&self) -> String {
        let addresses: BTreeSet<Ipv4Addr> = self.addresses.lock().iter().copied().collect();
        let list: Vec<String> = addresses.iter().map(Ipv4Addr::to_string).collect();
        format!("{}={}", self.name, list.join(","))
    }

    /// Addresses not yet handed out
    pub fn remaining(&self) -> usize {
        self.addresses.lock().len()
    }

    /// Take the next address.
    pub fn pop(&self) -> Result<Ipv4Addr> {
        let address = self
            .addresses
            .lock()
            .pop_front()
            .ok_or_else(|| Error::PoolExhausted {
                pool: self.name.clone(),
            })?;
        info!(pool = %self.name, address = %address, "Popped address from IP pool");
        Ok(address)
    }
}
