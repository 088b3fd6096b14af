//! Configuration documents
//!
//! A configuration file for the tool under test is a multi-document YAML
//! stream of Kubernetes-style manifests: one `Cluster`, one
//! `VSphereDatacenterConfig` and any number of `VSphereMachineConfig`s.
//! [`Document`] keeps them in file order. Fields the fillers never touch
//! (status, labels, unknown top-level keys) survive a parse/emit cycle.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{git, Error, Result};

/// Kind of the cluster-level manifest
pub const CLUSTER_KIND: &str = "Cluster";
/// Kind of the vSphere datacenter manifest
pub const VSPHERE_DATACENTER_CONFIG_KIND: &str = "VSphereDatacenterConfig";
/// Kind of a vSphere machine configuration manifest
pub const VSPHERE_MACHINE_CONFIG_KIND: &str = "VSphereMachineConfig";
/// API version used for manifests created from scratch
pub const DEFAULT_API_VERSION: &str = "anywhere.eks.amazonaws.com/v1alpha1";

/// Kinds emitted by provider customization
pub const PROVIDER_KINDS: &[&str] = &[VSPHERE_DATACENTER_CONFIG_KIND, VSPHERE_MACHINE_CONFIG_KIND];
/// Kinds emitted by cluster customization
pub const CLUSTER_KINDS: &[&str] = &[CLUSTER_KIND];

/// A single manifest with an untyped spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// API version (e.g., "anywhere.eks.amazonaws.com/v1alpha1")
    pub api_version: String,
    /// Kind of resource (e.g., "VSphereMachineConfig")
    pub kind: String,
    /// Resource metadata
    #[serde(default)]
    pub metadata: ManifestMetadata,
    /// Resource spec (untyped)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,
    /// Any other top-level fields, preserved as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Metadata for a manifest
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ManifestMetadata {
    /// Name of the resource
    #[serde(default)]
    pub name: String,
    /// Namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Labels, annotations and anything else
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Manifest {
    /// Create a manifest with an empty spec
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: Option<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            metadata: ManifestMetadata {
                name: name.into(),
                namespace,
                extra: BTreeMap::new(),
            },
            spec: Value::Object(Map::new()),
            extra: BTreeMap::new(),
        }
    }

    /// Set the spec for this manifest
    pub fn with_spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }

    /// Mapping at `spec.<path>`, creating missing or null intermediate
    /// mappings. `field` is only used to label the error when an existing
    /// segment is not a mapping.
    pub fn spec_object_mut(
        &mut self,
        field: &str,
        path: &[&str],
    ) -> Result<&mut Map<String, Value>> {
        let owner = format!("{} {}", self.kind, self.metadata.name);
        if self.spec.is_null() {
            self.spec = Value::Object(Map::new());
        }

        let mut walked = String::from("spec");
        let mut current = &mut self.spec;
        for segment in path {
            current = match current {
                Value::Object(map) => {
                    let next = map.entry(segment.to_string()).or_insert(Value::Null);
                    if next.is_null() {
                        *next = Value::Object(Map::new());
                    }
                    next
                }
                _ => {
                    return Err(Error::missing_target(
                        field,
                        format!("{walked} of {owner} is not a mapping"),
                    ))
                }
            };
            walked.push('.');
            walked.push_str(segment);
        }

        match current {
            Value::Object(map) => Ok(map),
            _ => Err(Error::missing_target(
                field,
                format!("{walked} of {owner} is not a mapping"),
            )),
        }
    }

    /// Read a string at `spec.<path>`
    pub fn spec_str(&self, path: &[&str]) -> Option<&str> {
        path.iter()
            .try_fold(&self.spec, |value, segment| value.get(segment))
            .and_then(Value::as_str)
    }
}

/// An ordered set of manifests parsed from one YAML stream
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    manifests: Vec<Manifest>,
}

impl Document {
    /// Wrap already-built manifests
    pub fn new(manifests: Vec<Manifest>) -> Self {
        Self { manifests }
    }

    /// Parse a multi-document YAML stream. Empty documents are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_labeled("configuration document", text)
    }

    fn parse_labeled(label: &str, text: &str) -> Result<Self> {
        let mut manifests = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(text) {
            let value = serde_yaml::Value::deserialize(doc)
                .map_err(|e| Error::decode(label, e.to_string()))?;
            if value.is_null() {
                continue;
            }
            let manifest: Manifest =
                serde_yaml::from_value(value).map_err(|e| Error::decode(label, e.to_string()))?;
            manifests.push(manifest);
        }
        Ok(Self { manifests })
    }

    /// All manifests in file order
    pub fn manifests(&self) -> &[Manifest] {
        &self.manifests
    }

    /// First manifest of the given kind
    pub fn find(&self, kind: &str) -> Option<&Manifest> {
        self.manifests.iter().find(|m| m.kind == kind)
    }

    /// First manifest of the given kind, mutable
    pub fn find_mut(&mut self, kind: &str) -> Option<&mut Manifest> {
        self.manifests.iter_mut().find(|m| m.kind == kind)
    }

    /// Manifest of the given kind and name
    pub fn find_named(&self, kind: &str, name: &str) -> Option<&Manifest> {
        self.manifests
            .iter()
            .find(|m| m.kind == kind && m.metadata.name == name)
    }

    /// Manifest of the given kind and name, mutable
    pub fn find_named_mut(&mut self, kind: &str, name: &str) -> Option<&mut Manifest> {
        self.manifests
            .iter_mut()
            .find(|m| m.kind == kind && m.metadata.name == name)
    }

    /// Every manifest of the given kind, mutable
    pub fn of_kind_mut<'a>(&'a mut self, kind: &'a str) -> impl Iterator<Item = &'a mut Manifest> {
        self.manifests.iter_mut().filter(move |m| m.kind == kind)
    }

    /// Append a manifest
    pub fn push(&mut self, manifest: Manifest) {
        self.manifests.push(manifest);
    }

    /// Keep only manifests whose kind is in `kinds`, preserving order
    pub fn select(mut self, kinds: &[&str]) -> Self {
        self.manifests.retain(|m| kinds.contains(&m.kind.as_str()));
        self
    }

    /// Serialize back to a `---`-separated YAML stream
    pub fn to_yaml(&self) -> Result<String> {
        let parts = self
            .manifests
            .iter()
            .map(|m| serde_yaml::to_string(m).map_err(|e| Error::serialization(e.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join("---\n"))
    }
}

/// Where a customization pass reads its baseline document from
#[derive(Clone, Copy, Debug)]
pub enum DocumentSource<'a> {
    /// A config file on disk
    File(&'a Path),
    /// Bytes produced by an earlier pass and not yet written out
    Bytes(&'a [u8]),
    /// A file tracked in a git working tree, relative to the repository root
    Git {
        /// Repository root
        repo: &'a Path,
        /// Path relative to `repo`
        path: &'a Path,
    },
}

impl DocumentSource<'_> {
    /// Human-readable label used in errors and logs
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("in-memory document ({} bytes)", bytes.len()),
            Self::Git { repo, path } => format!("{} in {}", path.display(), repo.display()),
        }
    }

    /// Read the raw text of the document
    pub fn read(&self) -> Result<String> {
        match self {
            Self::File(path) => Ok(std::fs::read_to_string(path)?),
            Self::Bytes(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::decode(self.describe(), e.to_string())),
            Self::Git { repo, path } => {
                let full = git::tracked_path(repo, path)?;
                Ok(std::fs::read_to_string(full)?)
            }
        }
    }

    /// Read and parse the document
    pub fn load(&self) -> Result<Document> {
        let text = self.read()?;
        Document::parse_labeled(&self.describe(), &text)
    }
}
