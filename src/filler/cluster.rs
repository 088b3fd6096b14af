//! Cluster fillers
//!
//! These write to the `Cluster` manifest: the control plane endpoint handed
//! out by the IP allocator, and worker node groups wired to the machine
//! configs registered by the provider.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::Filler;
use crate::document::{Document, CLUSTER_KIND};
use crate::{Error, Result};

/// Field set by [`ClusterFiller::ControlPlaneEndpointIp`]
pub const CONTROL_PLANE_ENDPOINT_FIELD: &str = "spec.controlPlaneConfiguration.endpoint.host";

/// Kind and name of the machine config a node group runs on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineConfigRef {
    /// Machine config kind (e.g. "VSphereMachineConfig")
    pub kind: String,
    /// Machine config name
    pub name: String,
}

/// A worker node group as declared by a test
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkerNodeGroup {
    /// Node group name
    pub name: String,
    /// Node count; left untouched when `None`
    pub count: Option<u32>,
    /// Node labels
    pub labels: BTreeMap<String, String>,
    /// Machine config reference; set by the provider on registration
    pub machine_config: Option<MachineConfigRef>,
}

impl WorkerNodeGroup {
    /// Create a node group with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the node count
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Add a node label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Point the node group at a machine config
    pub fn with_machine_config(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.machine_config = Some(MachineConfigRef {
            kind: kind.into(),
            name: name.into(),
        });
        self
    }

    /// Filler upserting this node group into the cluster spec
    pub fn cluster_filler(&self) -> ClusterFiller {
        ClusterFiller::WorkerNodeGroup(self.clone())
    }

    fn merge_into(&self, entry: &mut Map<String, Value>) {
        entry.insert("name".into(), Value::from(self.name.as_str()));
        if let Some(count) = self.count {
            entry.insert("count".into(), Value::from(count));
        }
        if !self.labels.is_empty() {
            entry.insert("labels".into(), json!(self.labels));
        }
        if let Some(ref machine_config) = self.machine_config {
            entry.insert(
                "machineGroupRef".into(),
                json!({ "kind": machine_config.kind, "name": machine_config.name }),
            );
        }
    }
}

/// A mutation of the `Cluster` manifest
#[derive(Clone, Debug, PartialEq)]
pub enum ClusterFiller {
    /// `spec.controlPlaneConfiguration.endpoint.host`
    ControlPlaneEndpointIp(String),
    /// `spec.controlPlaneConfiguration.count`
    ControlPlaneCount(u32),
    /// `spec.kubernetesVersion`
    KubernetesVersion(String),
    /// Upsert by name into `spec.workerNodeGroupConfigurations`
    WorkerNodeGroup(WorkerNodeGroup),
}

impl ClusterFiller {
    /// Whether this filler sets the control plane endpoint
    pub fn is_control_plane_endpoint(&self) -> bool {
        matches!(self, Self::ControlPlaneEndpointIp(_))
    }
}

impl Filler for ClusterFiller {
    fn field(&self) -> &'static str {
        match self {
            Self::ControlPlaneEndpointIp(_) => CONTROL_PLANE_ENDPOINT_FIELD,
            Self::ControlPlaneCount(_) => "spec.controlPlaneConfiguration.count",
            Self::KubernetesVersion(_) => "spec.kubernetesVersion",
            Self::WorkerNodeGroup(_) => "spec.workerNodeGroupConfigurations",
        }
    }

    fn fill(&self, mut document: Document) -> Result<Document> {
        let field = self.field();
        let cluster = document
            .find_mut(CLUSTER_KIND)
            .ok_or_else(|| Error::missing_target(field, "no Cluster in document"))?;

        match self {
            Self::ControlPlaneEndpointIp(ip) => {
                cluster
                    .spec_object_mut(field, &["controlPlaneConfiguration", "endpoint"])?
                    .insert("host".into(), Value::from(ip.as_str()));
            }
            Self::ControlPlaneCount(count) => {
                cluster
                    .spec_object_mut(field, &["controlPlaneConfiguration"])?
                    .insert("count".into(), Value::from(*count));
            }
            Self::KubernetesVersion(version) => {
                cluster
                    .spec_object_mut(field, &[])?
                    .insert("kubernetesVersion".into(), Value::from(version.as_str()));
            }
            Self::WorkerNodeGroup(group) => {
                let owner = format!("Cluster {}", cluster.metadata.name);
                let spec = cluster.spec_object_mut(field, &[])?;
                let groups = spec
                    .entry("workerNodeGroupConfigurations")
                    .or_insert(Value::Null);
                if groups.is_null() {
                    *groups = json!([]);
                }
                let groups = groups.as_array_mut().ok_or_else(|| {
                    Error::missing_target(field, format!("{field} of {owner} is not a list"))
                })?;

                let existing = groups
                    .iter_mut()
                    .filter_map(Value::as_object_mut)
                    .find(|entry| {
                        entry.get("name").and_then(Value::as_str) == Some(group.name.as_str())
                    });
                match existing {
                    Some(entry) => group.merge_into(entry),
                    None => {
                        let mut entry = Map::new();
                        group.merge_into(&mut entry);
                        groups.push(Value::Object(entry));
                    }
                }
            }
        }
        Ok(document)
    }
}
