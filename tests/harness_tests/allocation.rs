//! Stories about handing out control plane endpoints

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use vsphere_e2e::env::{CIDR_VAR, CLUSTER_IP_POOL_VAR};
use vsphere_e2e::filler::ClusterFiller;
use vsphere_e2e::network::{IpAllocator, IpPool};
use vsphere_e2e::{Error, VSphereHarness};

use super::helpers::*;

fn endpoint(fillers: &[ClusterFiller]) -> Ipv4Addr {
    match fillers.last() {
        Some(ClusterFiller::ControlPlaneEndpointIp(ip)) => ip.parse().unwrap(),
        other => panic!("expected an endpoint filler last, got {other:?}"),
    }
}

/// Story: CI runs eight vSphere tests in parallel in one process and hands
/// them a pool of eight addresses. Every test gets its own endpoint, and a
/// ninth test fails loudly instead of reusing one.
#[tokio::test]
async fn parallel_tests_draw_distinct_endpoints_from_the_pool() {
    init_test();
    let pool: Vec<String> = (10..18).map(|i| format!("10.50.0.{i}")).collect();
    let env = complete_env().with_var(CLUSTER_IP_POOL_VAR, pool.join(","));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let env = env.clone();
        handles.push(tokio::spawn(async move {
            let probe = Arc::new(FakeProbe::default());
            let mut harness = VSphereHarness::with_probe(&env, probe.clone()).unwrap();
            let fillers = harness.cluster_config_fillers().await.unwrap();
            assert!(probe.probed().is_empty(), "pool mode must not probe");
            endpoint(&fillers)
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        assert!(seen.insert(handle.await.unwrap()));
    }
    let expected: HashSet<Ipv4Addr> = pool.iter().map(|ip| ip.parse().unwrap()).collect();
    assert_eq!(seen, expected);

    let mut ninth = VSphereHarness::with_probe(&env, Arc::new(FakeProbe::default())).unwrap();
    match ninth.cluster_config_fillers().await.unwrap_err() {
        Error::PoolExhausted { pool } => assert_eq!(pool, CLUSTER_IP_POOL_VAR),
        other => panic!("expected PoolExhausted, got {other:?}"),
    }
}

#[test]
fn malformed_pool_fails_harness_construction() {
    init_test();
    let env = complete_env().with_var(CLUSTER_IP_POOL_VAR, "10.60.0.1,10.60.0.300");

    match VSphereHarness::with_probe(&env, Arc::new(FakeProbe::default())) {
        Err(Error::InvalidPoolAddress { address, .. }) => assert_eq!(address, "10.60.0.300"),
        Err(other) => panic!("expected InvalidPoolAddress, got {other:?}"),
        Ok(_) => panic!("harness accepted a malformed pool"),
    }
}

/// Story: without a pool, the harness probes its CIDR. When every host in a
/// small block is taken the test fails instead of reusing an address.
#[tokio::test]
async fn fully_used_block_fails_allocation() {
    init_test();
    let env = complete_env().with_var(CIDR_VAR, "10.70.0.0/29");
    let live = (1..=6).map(|i| Ipv4Addr::new(10, 70, 0, i));
    let probe = Arc::new(FakeProbe::with_live(live));
    let mut harness = VSphereHarness::with_probe(&env, probe.clone()).unwrap();

    match harness.cluster_config_fillers().await.unwrap_err() {
        Error::ProbeExhausted { cidr } => assert_eq!(cidr, "10.70.0.0/29"),
        other => panic!("expected ProbeExhausted, got {other:?}"),
    }
    assert_eq!(probe.probed().len(), 6);
}

#[tokio::test]
async fn malformed_cidr_fails_allocation() {
    init_test();
    let env = complete_env().with_var(CIDR_VAR, "10.0.0.0/40");
    let mut harness = VSphereHarness::with_probe(&env, Arc::new(FakeProbe::default())).unwrap();

    assert!(matches!(
        harness.cluster_config_fillers().await.unwrap_err(),
        Error::InvalidCidr { .. }
    ));
}

#[tokio::test]
async fn allocator_can_be_driven_directly() {
    init_test();
    let pool = Arc::new(IpPool::new("manual", [Ipv4Addr::new(192, 168, 1, 9)]));
    let allocator = IpAllocator::pool(pool.clone());

    assert_eq!(allocator.allocate("").await.unwrap(), Ipv4Addr::new(192, 168, 1, 9));
    assert_eq!(pool.remaining(), 0);

    let probe = Arc::new(FakeProbe::with_live([Ipv4Addr::new(192, 168, 2, 1)]));
    let allocator = IpAllocator::probe(probe);
    assert_eq!(
        allocator.allocate("192.168.2.0/24").await.unwrap(),
        Ipv4Addr::new(192, 168, 2, 2)
    );
}
