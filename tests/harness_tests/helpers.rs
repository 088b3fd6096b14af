//! Shared fixtures for harness integration tests

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use vsphere_e2e::document::Document;
use vsphere_e2e::env::*;
use vsphere_e2e::network::ReachabilityProbe;
use vsphere_e2e::Result;

/// Baseline config as generated by the tool under test
pub const BASELINE: &str = r#"
apiVersion: anywhere.eks.amazonaws.com/v1alpha1
kind: Cluster
metadata:
  name: e2e
spec:
  kubernetesVersion: "1.22"
  controlPlaneConfiguration:
    count: 1
    endpoint:
      host: ""
    machineGroupRef:
      kind: VSphereMachineConfig
      name: e2e-cp
  datacenterRef:
    kind: VSphereDatacenterConfig
    name: e2e
  workerNodeGroupConfigurations:
    - name: md-0
      count: 1
      machineGroupRef:
        kind: VSphereMachineConfig
        name: e2e
---
apiVersion: anywhere.eks.amazonaws.com/v1alpha1
kind: VSphereDatacenterConfig
metadata:
  name: e2e
spec:
  datacenter: ""
  network: ""
  server: ""
  insecure: false
  thumbprint: ""
---
apiVersion: anywhere.eks.amazonaws.com/v1alpha1
kind: VSphereMachineConfig
metadata:
  name: e2e-cp
spec:
  template: ""
  osFamily: bottlerocket
  users:
    - name: capv
      sshAuthorizedKeys: [""]
---
apiVersion: anywhere.eks.amazonaws.com/v1alpha1
kind: VSphereMachineConfig
metadata:
  name: e2e
spec:
  template: ""
  osFamily: bottlerocket
  users:
    - name: capv
      sshAuthorizedKeys: [""]
"#;

/// Initialize tracing for a test
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Environment with every required variable set
pub fn complete_env() -> EnvConfig {
    EnvConfig::from_pairs(
        REQUIRED_VSPHERE_ENV_VARS
            .iter()
            .map(|name| (*name, format!("{}-value", name.to_lowercase()))),
    )
    .with_var(VSPHERE_DATACENTER_VAR, "DC1")
    .with_var(VSPHERE_NETWORK_VAR, "VM Network")
    .with_var(VSPHERE_PRIVATE_NETWORK_VAR, "Private Network")
    .with_var(VSPHERE_SSH_AUTHORIZED_KEY_VAR, "ssh-rsa AAAAB3Nza e2e")
    .with_var(VSPHERE_TLS_INSECURE_VAR, "false")
    .with_var(VSPHERE_TLS_THUMBPRINT_VAR, "AB:CD:EF")
    .with_var(VSPHERE_TEMPLATE_UBUNTU_122_VAR, "ubuntu-1.22")
    .with_var(VSPHERE_TEMPLATE_UBUNTU_121_VAR, "ubuntu-1.21")
    .with_var(CIDR_VAR, "10.0.0.0/24")
    .with_var(PRIVATE_NETWORK_CIDR_VAR, "10.10.0.0/24")
}

/// Write the baseline config under `dir` and return its path
pub fn write_baseline(dir: &Path) -> PathBuf {
    let path = dir.join("e2e-eks-a-cluster.yaml");
    std::fs::write(&path, BASELINE).unwrap();
    path
}

/// Parse emitted document bytes
pub fn parse(bytes: &[u8]) -> Document {
    Document::parse(std::str::from_utf8(bytes).unwrap()).unwrap()
}

/// Probe answering from a fixed set of live addresses and recording every
/// address it was asked about
#[derive(Default)]
pub struct FakeProbe {
    live: BTreeSet<Ipv4Addr>,
    probed: Mutex<Vec<Ipv4Addr>>,
}

impl FakeProbe {
    /// Probe where `addresses` are in use
    pub fn with_live(addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self {
            live: addresses.into_iter().collect(),
            probed: Mutex::new(Vec::new()),
        }
    }

    /// Addresses probed so far, in order
    pub fn probed(&self) -> Vec<Ipv4Addr> {
        self.probed.lock().clone()
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn is_in_use(&self, address: Ipv4Addr) -> Result<bool> {
        self.probed.lock().push(address);
        Ok(self.live.contains(&address))
    }
}
