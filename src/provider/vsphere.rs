//! vSphere scenario harness
//!
//! [`VSphereHarness`] owns the provider fillers, cluster fillers, endpoint
//! CIDR and inventory credentials for one test. Options append fillers in
//! registration order, so baseline defaults always precede test overrides.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::Provider;
use crate::document::{DocumentSource, VSPHERE_MACHINE_CONFIG_KIND};
use crate::env::*;
use crate::filler::{
    autofill_cluster, autofill_provider, ClusterFiller, MachineFiller, OsFamily, ProviderFiller,
    WorkerNodeGroup,
};
use crate::network::{AllocationStrategy, IpAllocator, ReachabilityProbe, TcpProbe};
use crate::scenario::ClusterScenario;
use crate::{Error, Result};

/// Name reported by [`VSphereHarness`]
pub const VSPHERE_PROVIDER_NAME: &str = "vsphere";

/// Credentials for the vSphere inventory client
#[derive(Clone, PartialEq, Eq)]
pub struct InventoryCredentials {
    /// vCenter URL (`GOVC_URL`)
    pub url: String,
    /// Login user
    pub username: String,
    /// Login password
    pub password: String,
}

impl InventoryCredentials {
    fn from_env(env: &EnvConfig) -> Self {
        Self {
            url: env.get_or_empty(GOVC_URL_VAR),
            username: env.get_or_empty(VSPHERE_USERNAME_VAR),
            password: env.get_or_empty(VSPHERE_PASSWORD_VAR),
        }
    }
}

impl fmt::Debug for InventoryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryCredentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Node OS template a scenario runs on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OsTemplate {
    /// Ubuntu, Kubernetes 1.18
    Ubuntu118,
    /// Ubuntu, Kubernetes 1.19
    Ubuntu119,
    /// Ubuntu, Kubernetes 1.20
    Ubuntu120,
    /// Ubuntu, Kubernetes 1.21
    Ubuntu121,
    /// Ubuntu, Kubernetes 1.22
    Ubuntu122,
    /// Bottlerocket, Kubernetes 1.20
    Bottlerocket120,
    /// Bottlerocket, Kubernetes 1.21
    Bottlerocket121,
}

impl OsTemplate {
    /// Variable holding the template path
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Ubuntu118 => VSPHERE_TEMPLATE_UBUNTU_118_VAR,
            Self::Ubuntu119 => VSPHERE_TEMPLATE_UBUNTU_119_VAR,
            Self::Ubuntu120 => VSPHERE_TEMPLATE_UBUNTU_120_VAR,
            Self::Ubuntu121 => VSPHERE_TEMPLATE_UBUNTU_121_VAR,
            Self::Ubuntu122 => VSPHERE_TEMPLATE_UBUNTU_122_VAR,
            Self::Bottlerocket120 => VSPHERE_TEMPLATE_BR_120_VAR,
            Self::Bottlerocket121 => VSPHERE_TEMPLATE_BR_121_VAR,
        }
    }

    /// OS family written next to the template
    pub fn os_family(&self) -> OsFamily {
        match self {
            Self::Bottlerocket120 | Self::Bottlerocket121 => OsFamily::Bottlerocket,
            _ => OsFamily::Ubuntu,
        }
    }

    /// Template-for-all-machines filler sourced from [`OsTemplate::env_var`]
    pub fn template_filler(&self, env: &EnvConfig) -> ProviderFiller {
        ProviderFiller::from_env(env, self.env_var(), |template| {
            ProviderFiller::for_all_machines(MachineFiller::Template(template))
        })
    }
}

/// A test-specific adjustment of the harness
#[derive(Clone, Debug, PartialEq)]
pub enum HarnessOption {
    /// Run every machine on the given OS template
    Os(OsTemplate),
    /// Use the private network and its CIDR for the endpoint
    PrivateNetwork,
    /// Add a worker node group backed by its own machine config
    WorkerNodeGroup {
        /// Machine config name
        name: String,
        /// Node group to register in the cluster spec
        group: WorkerNodeGroup,
        /// Extra fillers for the machine config, applied after the defaults
        fillers: Vec<MachineFiller>,
    },
    /// Append provider fillers
    Fillers(Vec<ProviderFiller>),
}

/// Per-test vSphere configuration state
pub struct VSphereHarness {
    env: EnvConfig,
    fillers: Vec<ProviderFiller>,
    cluster_fillers: Vec<ClusterFiller>,
    cidr: String,
    credentials: InventoryCredentials,
    allocator: IpAllocator,
}

impl VSphereHarness {
    /// Build a harness that probes endpoints over TCP when no IP pool is set.
    pub fn new(env: &EnvConfig) -> Result<Self> {
        Self::with_probe(env, Arc::new(TcpProbe::default()))
    }

    /// Build a harness with a custom reachability probe.
    ///
    /// Fails with every missing required variable before anything else is
    /// built.
    pub fn with_probe(env: &EnvConfig, probe: Arc<dyn ReachabilityProbe>) -> Result<Self> {
        env.require(REQUIRED_VSPHERE_ENV_VARS)?;

        let allocator = IpAllocator::from_env(env, probe)?;
        let harness = Self {
            env: env.clone(),
            fillers: baseline_fillers(env),
            cluster_fillers: Vec::new(),
            cidr: env.get_or_empty(CIDR_VAR),
            credentials: InventoryCredentials::from_env(env),
            allocator,
        };

        info!(
            cidr = %harness.cidr,
            ip_pool = matches!(harness.allocator.strategy(), AllocationStrategy::Pool(_)),
            fillers = harness.fillers.len(),
            "Created vSphere harness"
        );
        Ok(harness)
    }

    /// Apply one option
    pub fn with_option(mut self, option: HarnessOption) -> Self {
        match option {
            HarnessOption::Os(template) => {
                self.fillers.push(template.template_filler(&self.env));
                self.fillers.push(ProviderFiller::for_all_machines(
                    MachineFiller::OsFamily(template.os_family()),
                ));
            }
            HarnessOption::PrivateNetwork => {
                self.fillers.push(ProviderFiller::from_env(
                    &self.env,
                    VSPHERE_PRIVATE_NETWORK_VAR,
                    ProviderFiller::Network,
                ));
                self.cidr = self.env.get_or_empty(PRIVATE_NETWORK_CIDR_VAR);
            }
            HarnessOption::WorkerNodeGroup { name, group, fillers } => {
                let machine_config = self.worker_machine_config(&name, fillers);
                self.fillers.push(machine_config);
                self.cluster_fillers.push(worker_group_filler(&name, group));
            }
            HarnessOption::Fillers(fillers) => self.fillers.extend(fillers),
        }
        self
    }

    /// Apply options in order
    pub fn with_options(self, options: impl IntoIterator<Item = HarnessOption>) -> Self {
        options.into_iter().fold(self, Self::with_option)
    }

    /// Registered provider fillers, in application order
    pub fn fillers(&self) -> &[ProviderFiller] {
        &self.fillers
    }

    /// Registered cluster fillers, in application order
    pub fn cluster_fillers(&self) -> &[ClusterFiller] {
        &self.cluster_fillers
    }

    /// CIDR endpoints are probed in
    pub fn cidr(&self) -> &str {
        &self.cidr
    }

    /// Inventory client credentials
    pub fn credentials(&self) -> &InventoryCredentials {
        &self.credentials
    }

    /// Apply every registered provider filler to a fresh config file.
    pub fn customize_provider_config(&self, file: &Path) -> Result<Vec<u8>> {
        self.customize_provider_config_with(DocumentSource::File(file), &self.fillers)
    }

    /// Apply `fillers` to `source` and return the provider manifests.
    pub fn customize_provider_config_with(
        &self,
        source: DocumentSource<'_>,
        fillers: &[ProviderFiller],
    ) -> Result<Vec<u8>> {
        autofill_provider(source, fillers)
    }

    /// Re-customize the scenario's cluster config file with upgrade fillers.
    pub fn provider_upgrade(
        &self,
        scenario: &mut ClusterScenario,
        fillers: &[ProviderFiller],
    ) -> Result<()> {
        scenario.provider_config =
            self.customize_provider_config_with(scenario.config_file(), fillers)?;
        info!(
            cluster = %scenario.cluster_name,
            fillers = fillers.len(),
            "Applied provider upgrade"
        );
        Ok(())
    }

    /// Re-customize the cluster config tracked in the scenario's git working tree.
    pub fn provider_upgrade_git(
        &self,
        scenario: &mut ClusterScenario,
        fillers: &[ProviderFiller],
    ) -> Result<()> {
        let repo = scenario.git_repo().ok_or_else(|| Error::NoGitRepository {
            cluster: scenario.cluster_name.clone(),
        })?;
        let path = scenario.git_config_path();
        let output = self.customize_provider_config_with(
            DocumentSource::Git { repo, path: &path },
            fillers,
        )?;

        scenario.provider_config = output;
        info!(
            cluster = %scenario.cluster_name,
            fillers = fillers.len(),
            "Applied provider upgrade from git"
        );
        Ok(())
    }

    /// Add a worker node group to a running scenario.
    ///
    /// The provider side reads the config file; the cluster side reads the
    /// scenario's in-memory cluster config, which may hold changes that were
    /// not written out yet. Both are computed before either is stored.
    pub fn new_worker_node_group(
        &self,
        scenario: &mut ClusterScenario,
        name: &str,
        group: WorkerNodeGroup,
        fillers: Vec<MachineFiller>,
    ) -> Result<()> {
        let provider_config = self.customize_provider_config_with(
            scenario.config_file(),
            &[self.worker_machine_config(name, fillers)],
        )?;
        let cluster_config = autofill_cluster(
            scenario.cluster_config_bytes(),
            &[worker_group_filler(name, group)],
        )?;

        scenario.provider_config = provider_config;
        scenario.cluster_config = cluster_config;
        info!(cluster = %scenario.cluster_name, machine_config = name, "Added worker node group");
        Ok(())
    }

    /// Allocate a control plane endpoint and return the cluster fillers.
    ///
    /// A previously allocated endpoint filler is replaced, so the list always
    /// holds exactly one, in last position.
    pub async fn cluster_config_fillers(&mut self) -> Result<Vec<ClusterFiller>> {
        let address = self.allocator.allocate(&self.cidr).await?;

        self.cluster_fillers
            .retain(|filler| !filler.is_control_plane_endpoint());
        self.cluster_fillers
            .push(ClusterFiller::ControlPlaneEndpointIp(address.to_string()));

        info!(endpoint = %address, "Allocated control plane endpoint");
        Ok(self.cluster_fillers.clone())
    }

    /// Machine config filler for a worker node group.
    ///
    /// The baseline for-all-machines fillers have already run by the time
    /// this machine config exists, so the env-sourced placement is repeated
    /// here ahead of the caller's fillers.
    fn worker_machine_config(&self, name: &str, fillers: Vec<MachineFiller>) -> ProviderFiller {
        let env_sourced: [(&str, fn(String) -> MachineFiller); 5] = [
            (VSPHERE_DATASTORE_VAR, MachineFiller::Datastore),
            (VSPHERE_FOLDER_VAR, MachineFiller::Folder),
            (VSPHERE_RESOURCE_POOL_VAR, MachineFiller::ResourcePool),
            (VSPHERE_STORAGE_POLICY_NAME_VAR, MachineFiller::StoragePolicyName),
            (VSPHERE_SSH_AUTHORIZED_KEY_VAR, MachineFiller::SshAuthorizedKey),
        ];

        let mut machine = vec![MachineFiller::DefaultValues];
        machine.extend(env_sourced.into_iter().filter_map(|(var, setter)| {
            self.env.get(var).map(|value| setter(value.to_string()))
        }));
        machine.extend(fillers);
        ProviderFiller::machine_config(name, machine)
    }
}

#[async_trait]
impl Provider for VSphereHarness {
    fn name(&self) -> &'static str {
        VSPHERE_PROVIDER_NAME
    }

    fn setup(&self) -> Result<()> {
        Ok(())
    }

    fn customize_provider_config(&self, file: &Path) -> Result<Vec<u8>> {
        VSphereHarness::customize_provider_config(self, file)
    }

    async fn cluster_config_fillers(&mut self) -> Result<Vec<ClusterFiller>> {
        VSphereHarness::cluster_config_fillers(self).await
    }
}

fn baseline_fillers(env: &EnvConfig) -> Vec<ProviderFiller> {
    let all_machines = |filler: fn(String) -> MachineFiller| {
        move |value: String| ProviderFiller::for_all_machines(filler(value))
    };

    vec![
        ProviderFiller::from_env(env, VSPHERE_DATACENTER_VAR, ProviderFiller::Datacenter),
        ProviderFiller::from_env(
            env,
            VSPHERE_DATASTORE_VAR,
            all_machines(MachineFiller::Datastore),
        ),
        ProviderFiller::from_env(env, VSPHERE_FOLDER_VAR, all_machines(MachineFiller::Folder)),
        ProviderFiller::from_env(env, VSPHERE_NETWORK_VAR, ProviderFiller::Network),
        ProviderFiller::from_env(
            env,
            VSPHERE_RESOURCE_POOL_VAR,
            all_machines(MachineFiller::ResourcePool),
        ),
        ProviderFiller::from_env(env, VSPHERE_SERVER_VAR, ProviderFiller::Server),
        ProviderFiller::from_env(
            env,
            VSPHERE_SSH_AUTHORIZED_KEY_VAR,
            all_machines(MachineFiller::SshAuthorizedKey),
        ),
        ProviderFiller::from_env(
            env,
            VSPHERE_STORAGE_POLICY_NAME_VAR,
            all_machines(MachineFiller::StoragePolicyName),
        ),
        ProviderFiller::from_env_bool(env, VSPHERE_TLS_INSECURE_VAR, ProviderFiller::TlsInsecure),
        ProviderFiller::from_env(env, VSPHERE_TLS_THUMBPRINT_VAR, ProviderFiller::TlsThumbprint),
    ]
}

fn worker_group_filler(machine_config: &str, group: WorkerNodeGroup) -> ClusterFiller {
    group
        .with_machine_config(VSPHERE_MACHINE_CONFIG_KIND, machine_config)
        .cluster_filler()
}
