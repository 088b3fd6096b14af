//! Test environment configuration
//!
//! Every value a scenario reads from the environment is captured once into an
//! [`EnvConfig`] and passed by reference to filler factories. Nothing else in
//! the crate calls `std::env`.
//!
//! # Environment Variables
//!
//! ```bash
//! T_VSPHERE_DATACENTER=SDDC-Datacenter
//! T_VSPHERE_NETWORK="VM Network"
//! T_VSPHERE_CIDR=10.0.0.0/24
//! T_CLUSTER_IP_POOL=10.0.0.20,10.0.0.21   # optional, enables pool allocation
//! ```

use std::collections::BTreeMap;

use crate::{Error, Result};

/// vSphere datacenter every cluster is placed in
pub const VSPHERE_DATACENTER_VAR: &str = "T_VSPHERE_DATACENTER";
/// Datastore for machine disks
pub const VSPHERE_DATASTORE_VAR: &str = "T_VSPHERE_DATASTORE";
/// VM folder machines are created in
pub const VSPHERE_FOLDER_VAR: &str = "T_VSPHERE_FOLDER";
/// Port group clusters attach to by default
pub const VSPHERE_NETWORK_VAR: &str = "T_VSPHERE_NETWORK";
/// Port group used by private-network tests
pub const VSPHERE_PRIVATE_NETWORK_VAR: &str = "T_VSPHERE_PRIVATE_NETWORK";
/// Resource pool for machines
pub const VSPHERE_RESOURCE_POOL_VAR: &str = "T_VSPHERE_RESOURCE_POOL";
/// vCenter server address
pub const VSPHERE_SERVER_VAR: &str = "T_VSPHERE_SERVER";
/// Public key installed for the default machine user
pub const VSPHERE_SSH_AUTHORIZED_KEY_VAR: &str = "T_VSPHERE_SSH_AUTHORIZED_KEY";
/// Optional storage policy for machines
pub const VSPHERE_STORAGE_POLICY_NAME_VAR: &str = "T_VSPHERE_STORAGE_POLICY_NAME";
/// Ubuntu template for Kubernetes 1.18
pub const VSPHERE_TEMPLATE_UBUNTU_118_VAR: &str = "T_VSPHERE_TEMPLATE_UBUNTU_1_18";
/// Ubuntu template for Kubernetes 1.19
pub const VSPHERE_TEMPLATE_UBUNTU_119_VAR: &str = "T_VSPHERE_TEMPLATE_UBUNTU_1_19";
/// Ubuntu template for Kubernetes 1.20
pub const VSPHERE_TEMPLATE_UBUNTU_120_VAR: &str = "T_VSPHERE_TEMPLATE_UBUNTU_1_20";
/// Ubuntu template for Kubernetes 1.21
pub const VSPHERE_TEMPLATE_UBUNTU_121_VAR: &str = "T_VSPHERE_TEMPLATE_UBUNTU_1_21";
/// Ubuntu template for Kubernetes 1.22
pub const VSPHERE_TEMPLATE_UBUNTU_122_VAR: &str = "T_VSPHERE_TEMPLATE_UBUNTU_1_22";
/// Bottlerocket template for Kubernetes 1.20
pub const VSPHERE_TEMPLATE_BR_120_VAR: &str = "T_VSPHERE_TEMPLATE_BR_1_20";
/// Bottlerocket template for Kubernetes 1.21
pub const VSPHERE_TEMPLATE_BR_121_VAR: &str = "T_VSPHERE_TEMPLATE_BR_1_21";
/// `true` skips vCenter certificate verification
pub const VSPHERE_TLS_INSECURE_VAR: &str = "T_VSPHERE_TLS_INSECURE";
/// vCenter certificate thumbprint
pub const VSPHERE_TLS_THUMBPRINT_VAR: &str = "T_VSPHERE_TLS_THUMBPRINT";
/// vCenter username
pub const VSPHERE_USERNAME_VAR: &str = "EKSA_VSPHERE_USERNAME";
/// vCenter password
pub const VSPHERE_PASSWORD_VAR: &str = "EKSA_VSPHERE_PASSWORD";
/// Block scanned for a free control plane endpoint
pub const CIDR_VAR: &str = "T_VSPHERE_CIDR";
/// Block scanned for endpoints on the private network
pub const PRIVATE_NETWORK_CIDR_VAR: &str = "T_VSPHERE_PRIVATE_NETWORK_CIDR";
/// vCenter URL used for inventory lookups
pub const GOVC_URL_VAR: &str = "GOVC_URL";

/// Comma-separated control plane endpoint addresses shared by parallel tests.
/// When set, endpoints are popped from it instead of probing the CIDR.
pub const CLUSTER_IP_POOL_VAR: &str = "T_CLUSTER_IP_POOL";

/// Variables that must be non-empty before a vSphere harness can be built.
///
/// The storage policy name and the IP pool are optional.
pub const REQUIRED_VSPHERE_ENV_VARS: &[&str] = &[
    VSPHERE_DATACENTER_VAR,
    VSPHERE_DATASTORE_VAR,
    VSPHERE_FOLDER_VAR,
    VSPHERE_NETWORK_VAR,
    VSPHERE_PRIVATE_NETWORK_VAR,
    VSPHERE_RESOURCE_POOL_VAR,
    VSPHERE_SERVER_VAR,
    VSPHERE_SSH_AUTHORIZED_KEY_VAR,
    VSPHERE_TEMPLATE_UBUNTU_118_VAR,
    VSPHERE_TEMPLATE_UBUNTU_119_VAR,
    VSPHERE_TEMPLATE_UBUNTU_120_VAR,
    VSPHERE_TEMPLATE_UBUNTU_121_VAR,
    VSPHERE_TEMPLATE_UBUNTU_122_VAR,
    VSPHERE_TEMPLATE_BR_120_VAR,
    VSPHERE_TEMPLATE_BR_121_VAR,
    VSPHERE_TLS_INSECURE_VAR,
    VSPHERE_TLS_THUMBPRINT_VAR,
    VSPHERE_USERNAME_VAR,
    VSPHERE_PASSWORD_VAR,
    CIDR_VAR,
    PRIVATE_NETWORK_CIDR_VAR,
    GOVC_URL_VAR,
];

/// Snapshot of the environment a test runs with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    vars: BTreeMap<String, String>,
}

impl EnvConfig {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn from_env() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build a config from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set a variable, replacing any previous value
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Remove a variable
    pub fn without_var(mut self, name: &str) -> Self {
        self.vars.remove(name);
        self
    }

    /// Raw lookup; `Some("")` is possible.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Lookup that treats an empty value as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.lookup(name).filter(|v| !v.is_empty())
    }

    /// Value of `name`, or an empty string when unset.
    pub fn get_or_empty(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    /// Fail with every variable in `names` that is unset or empty.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingEnvVars { vars: missing })
        }
    }
}
