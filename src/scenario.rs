//! Per-test cluster scenario state shared with the customization entry points

use std::path::{Path, PathBuf};

use crate::document::DocumentSource;
use crate::git;

/// What a running test knows about the cluster it drives
#[derive(Clone, Debug, Default)]
pub struct ClusterScenario {
    /// Cluster name
    pub cluster_name: String,
    /// Path of the generated cluster config file
    pub cluster_config_location: PathBuf,
    /// Current `Cluster` manifest bytes
    pub cluster_config: Vec<u8>,
    /// Current provider manifest bytes
    pub provider_config: Vec<u8>,
    /// Working tree holding the cluster config, for GitOps scenarios
    pub git_repo: Option<PathBuf>,
}

impl ClusterScenario {
    /// Scenario for `cluster_name` whose config lives at `location`
    pub fn new(cluster_name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            cluster_config_location: location.into(),
            ..Default::default()
        }
    }

    /// Track the cluster config in the git working tree at `repo`
    pub fn with_git_repo(mut self, repo: impl Into<PathBuf>) -> Self {
        self.git_repo = Some(repo.into());
        self
    }

    /// Path of the cluster config relative to the git repository root
    pub fn git_config_path(&self) -> PathBuf {
        git::cluster_config_path(&self.cluster_name)
    }

    /// Source reading the cluster config file on disk
    pub fn config_file(&self) -> DocumentSource<'_> {
        DocumentSource::File(&self.cluster_config_location)
    }

    /// Source reading the in-memory cluster config
    pub fn cluster_config_bytes(&self) -> DocumentSource<'_> {
        DocumentSource::Bytes(&self.cluster_config)
    }

    /// Git repository root, if the scenario has one
    pub fn git_repo(&self) -> Option<&Path> {
        self.git_repo.as_deref()
    }
}
