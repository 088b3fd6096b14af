//! Management cluster descriptor
//!
//! Workload-cluster tests can run against an existing management cluster
//! instead of bootstrapping one. The cluster is identified by a kubeconfig
//! whose first declared cluster names it.

use std::path::{Path, PathBuf};

use kube::config::Kubeconfig;
use tracing::info;

use crate::{Error, Result};

/// An existing management cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagementCluster {
    /// Name of the first cluster in the kubeconfig
    pub name: String,
    /// Path the kubeconfig was loaded from
    pub kubeconfig: PathBuf,
    /// Always true for a loaded descriptor
    pub existing_management: bool,
}

/// Load the management cluster described by the kubeconfig at `path`.
///
/// An empty path means no management cluster was configured and returns
/// `Ok(None)`.
pub fn load_management(path: impl AsRef<Path>) -> Result<Option<ManagementCluster>> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    let kubeconfig: Kubeconfig = serde_yaml::from_str(&raw)
        .map_err(|e| Error::decode(format!("kubeconfig {}", path.display()), e.to_string()))?;

    let first = kubeconfig.clusters.first().ok_or_else(|| Error::NoClusters {
        path: path.to_path_buf(),
    })?;

    info!(cluster = %first.name, kubeconfig = %path.display(), "Loaded management cluster");
    Ok(Some(ManagementCluster {
        name: first.name.clone(),
        kubeconfig: path.to_path_buf(),
        existing_management: true,
    }))
}
