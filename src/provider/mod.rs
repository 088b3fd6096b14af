//! Infrastructure provider abstraction for e2e scenarios
//!
//! A provider customizes the baseline cluster config for its platform and
//! contributes cluster fillers, most importantly the control plane endpoint.
//! Each provider implements the [`Provider`] trait.
//!
//! # Supported Providers
//!
//! - [`VSphereHarness`] - vSphere
//!
//! # Example
//!
//! ```text
//! let env = EnvConfig::from_env();
//! let mut provider =
//!     VSphereHarness::new(&env)?.with_option(HarnessOption::Os(OsTemplate::Ubuntu122));
//! let mut scenario = ClusterScenario::new("e2e", "e2e/e2e-eks-a-cluster.yaml");
//! generate_cluster_config(&mut provider, &mut scenario).await?;
//! ```

mod vsphere;

pub use vsphere::{
    HarnessOption, InventoryCredentials, OsTemplate, VSphereHarness, VSPHERE_PROVIDER_NAME,
};

use std::path::Path;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::info;

use crate::filler::{autofill_cluster, ClusterFiller};
use crate::scenario::ClusterScenario;
use crate::Result;

/// Platform-specific customization of a scenario's configuration documents
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name (e.g. "vsphere")
    fn name(&self) -> &'static str;

    /// Prepare the platform before the cluster is created
    fn setup(&self) -> Result<()>;

    /// Apply the provider's fillers to the config file at `file` and return
    /// the provider manifests.
    fn customize_provider_config(&self, file: &Path) -> Result<Vec<u8>>;

    /// Cluster fillers for a fresh cluster, ending with the control plane
    /// endpoint filler.
    async fn cluster_config_fillers(&mut self) -> Result<Vec<ClusterFiller>>;
}

/// Produce both documents for a freshly created cluster.
///
/// Reads the baseline from the scenario's config file and stores the
/// customized provider and cluster bytes on the scenario.
pub async fn generate_cluster_config<P>(
    provider: &mut P,
    scenario: &mut ClusterScenario,
) -> Result<()>
where
    P: Provider + ?Sized,
{
    provider.setup()?;
    let provider_config = provider.customize_provider_config(&scenario.cluster_config_location)?;
    let fillers = provider.cluster_config_fillers().await?;
    let cluster_config = autofill_cluster(scenario.config_file(), &fillers)?;

    scenario.provider_config = provider_config;
    scenario.cluster_config = cluster_config;
    info!(
        provider = provider.name(),
        cluster = %scenario.cluster_name,
        "Generated cluster config"
    );
    Ok(())
}
