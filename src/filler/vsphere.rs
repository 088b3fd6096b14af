//! vSphere provider fillers
//!
//! Datacenter fillers write to the single `VSphereDatacenterConfig`. Machine
//! fillers write to one `VSphereMachineConfig` and are lifted into provider
//! fillers either for every machine config in the document or for one named
//! machine config.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Filler;
use crate::document::{
    Document, Manifest, DEFAULT_API_VERSION, VSPHERE_DATACENTER_CONFIG_KIND,
    VSPHERE_MACHINE_CONFIG_KIND,
};
use crate::env::EnvConfig;
use crate::{Error, Result};

/// User seeded into machine configs that declare no users
pub const DEFAULT_SSH_USER: &str = "capv";
/// Default vCPU count for a machine config
pub const DEFAULT_NUM_CPUS: u32 = 2;
/// Default memory for a machine config
pub const DEFAULT_MEMORY_MIB: u32 = 8192;
/// Default disk size for a machine config
pub const DEFAULT_DISK_GIB: u32 = 25;

/// Node operating system family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Ubuntu
    Ubuntu,
    /// Bottlerocket
    Bottlerocket,
}

impl OsFamily {
    /// Value written to `spec.osFamily`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ubuntu => "ubuntu",
            Self::Bottlerocket => "bottlerocket",
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation of one `VSphereMachineConfig`
#[derive(Clone, Debug, PartialEq)]
pub enum MachineFiller {
    /// `spec.template`
    Template(String),
    /// `spec.osFamily`
    OsFamily(OsFamily),
    /// `spec.datastore`
    Datastore(String),
    /// `spec.folder`
    Folder(String),
    /// `spec.resourcePool`
    ResourcePool(String),
    /// `spec.storagePolicyName`
    StoragePolicyName(String),
    /// `spec.users[0].sshAuthorizedKeys`
    SshAuthorizedKey(String),
    /// `spec.numCPUs`
    NumCpus(u32),
    /// `spec.memoryMiB`
    MemoryMiB(u32),
    /// `spec.diskGiB`
    DiskGiB(u32),
    /// CPU, memory and disk defaults
    DefaultValues,
}

impl MachineFiller {
    /// Field this filler sets
    pub fn field(&self) -> &'static str {
        match self {
            Self::Template(_) => "spec.template",
            Self::OsFamily(_) => "spec.osFamily",
            Self::Datastore(_) => "spec.datastore",
            Self::Folder(_) => "spec.folder",
            Self::ResourcePool(_) => "spec.resourcePool",
            Self::StoragePolicyName(_) => "spec.storagePolicyName",
            Self::SshAuthorizedKey(_) => "spec.users[0].sshAuthorizedKeys",
            Self::NumCpus(_) => "spec.numCPUs",
            Self::MemoryMiB(_) => "spec.memoryMiB",
            Self::DiskGiB(_) => "spec.diskGiB",
            Self::DefaultValues => "spec.{numCPUs,memoryMiB,diskGiB}",
        }
    }

    /// Apply to a single machine config
    pub fn fill_machine(&self, machine: &mut Manifest) -> Result<()> {
        let field = self.field();
        match self {
            Self::Template(v) => set(machine, field, "template", Value::from(v.as_str())),
            Self::OsFamily(os) => set(machine, field, "osFamily", Value::from(os.as_str())),
            Self::Datastore(v) => set(machine, field, "datastore", Value::from(v.as_str())),
            Self::Folder(v) => set(machine, field, "folder", Value::from(v.as_str())),
            Self::ResourcePool(v) => set(machine, field, "resourcePool", Value::from(v.as_str())),
            Self::StoragePolicyName(v) => {
                set(machine, field, "storagePolicyName", Value::from(v.as_str()))
            }
            Self::SshAuthorizedKey(key) => set_ssh_key(machine, field, key),
            Self::NumCpus(n) => set(machine, field, "numCPUs", Value::from(*n)),
            Self::MemoryMiB(n) => set(machine, field, "memoryMiB", Value::from(*n)),
            Self::DiskGiB(n) => set(machine, field, "diskGiB", Value::from(*n)),
            Self::DefaultValues => {
                let spec = machine.spec_object_mut(field, &[])?;
                spec.insert("numCPUs".into(), Value::from(DEFAULT_NUM_CPUS));
                spec.insert("memoryMiB".into(), Value::from(DEFAULT_MEMORY_MIB));
                spec.insert("diskGiB".into(), Value::from(DEFAULT_DISK_GIB));
                Ok(())
            }
        }
    }
}

fn set(manifest: &mut Manifest, field: &str, key: &str, value: Value) -> Result<()> {
    manifest.spec_object_mut(field, &[])?.insert(key.to_string(), value);
    Ok(())
}

fn set_ssh_key(machine: &mut Manifest, field: &str, key: &str) -> Result<()> {
    let owner = format!("{} {}", machine.kind, machine.metadata.name);
    let spec = machine.spec_object_mut(field, &[])?;

    let users = spec.entry("users").or_insert(Value::Null);
    if users.is_null() {
        *users = json!([]);
    }
    let users = users.as_array_mut().ok_or_else(|| {
        Error::missing_target(field, format!("spec.users of {owner} is not a list"))
    })?;
    if users.is_empty() {
        users.push(json!({ "name": DEFAULT_SSH_USER }));
    }

    let first = users[0].as_object_mut().ok_or_else(|| {
        Error::missing_target(field, format!("spec.users[0] of {owner} is not a mapping"))
    })?;
    first.insert("sshAuthorizedKeys".into(), json!([key]));
    Ok(())
}

/// A mutation of the vSphere provider manifests
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderFiller {
    /// Does nothing; produced by environment factories when the variable is unset
    Noop,
    /// `spec.datacenter` of the datacenter config
    Datacenter(String),
    /// `spec.network` of the datacenter config
    Network(String),
    /// `spec.server` of the datacenter config
    Server(String),
    /// `spec.insecure` of the datacenter config
    TlsInsecure(bool),
    /// `spec.thumbprint` of the datacenter config
    TlsThumbprint(String),
    /// A machine filler applied to every machine config
    AllMachines(MachineFiller),
    /// Machine fillers applied, in order, to the machine config `name`,
    /// which is created when absent
    MachineConfig {
        /// Machine config name
        name: String,
        /// Fillers for that machine config
        fillers: Vec<MachineFiller>,
    },
}

impl ProviderFiller {
    /// Build a filler from the variable `var`, or [`ProviderFiller::Noop`]
    /// when it is unset or empty.
    pub fn from_env(env: &EnvConfig, var: &str, setter: impl FnOnce(String) -> Self) -> Self {
        env.get(var)
            .map(|value| setter(value.to_string()))
            .unwrap_or(Self::Noop)
    }

    /// Boolean variant of [`ProviderFiller::from_env`]: `"true"` is true,
    /// any other non-empty value is false.
    pub fn from_env_bool(env: &EnvConfig, var: &str, setter: impl FnOnce(bool) -> Self) -> Self {
        env.get(var)
            .map(|value| setter(value == "true"))
            .unwrap_or(Self::Noop)
    }

    /// Lift a machine filler to every machine config
    pub fn for_all_machines(filler: MachineFiller) -> Self {
        Self::AllMachines(filler)
    }

    /// Fillers for one named machine config
    pub fn machine_config(name: impl Into<String>, fillers: Vec<MachineFiller>) -> Self {
        Self::MachineConfig {
            name: name.into(),
            fillers,
        }
    }

    fn fill_datacenter(
        document: &mut Document,
        field: &str,
        key: &str,
        value: Value,
    ) -> Result<()> {
        let datacenter = document
            .find_mut(VSPHERE_DATACENTER_CONFIG_KIND)
            .ok_or_else(|| {
                Error::missing_target(field, "no VSphereDatacenterConfig in document")
            })?;
        set(datacenter, field, key, value)
    }

    fn fill_named_machine(
        document: &mut Document,
        name: &str,
        fillers: &[MachineFiller],
    ) -> Result<()> {
        if document.find_named(VSPHERE_MACHINE_CONFIG_KIND, name).is_none() {
            let (api_version, namespace) = document
                .find(VSPHERE_DATACENTER_CONFIG_KIND)
                .map(|dc| (dc.api_version.clone(), dc.metadata.namespace.clone()))
                .unwrap_or_else(|| (DEFAULT_API_VERSION.to_string(), None));
            document.push(Manifest::new(
                api_version,
                VSPHERE_MACHINE_CONFIG_KIND,
                name,
                namespace,
            ));
        }

        let machine = document
            .find_named_mut(VSPHERE_MACHINE_CONFIG_KIND, name)
            .ok_or_else(|| {
                Error::missing_target("machineConfig", format!("machine config {name} not found"))
            })?;
        fillers.iter().try_for_each(|f| f.fill_machine(machine))
    }
}

impl Filler for ProviderFiller {
    fn field(&self) -> &'static str {
        match self {
            Self::Noop => "none",
            Self::Datacenter(_) => "spec.datacenter",
            Self::Network(_) => "spec.network",
            Self::Server(_) => "spec.server",
            Self::TlsInsecure(_) => "spec.insecure",
            Self::TlsThumbprint(_) => "spec.thumbprint",
            Self::AllMachines(filler) => filler.field(),
            Self::MachineConfig { .. } => "machineConfig",
        }
    }

    fn fill(&self, mut document: Document) -> Result<Document> {
        let field = self.field();
        match self {
            Self::Noop => {}
            Self::Datacenter(v) => {
                Self::fill_datacenter(&mut document, field, "datacenter", Value::from(v.as_str()))?
            }
            Self::Network(v) => {
                Self::fill_datacenter(&mut document, field, "network", Value::from(v.as_str()))?
            }
            Self::Server(v) => {
                Self::fill_datacenter(&mut document, field, "server", Value::from(v.as_str()))?
            }
            Self::TlsInsecure(v) => {
                Self::fill_datacenter(&mut document, field, "insecure", Value::from(*v))?
            }
            Self::TlsThumbprint(v) => {
                Self::fill_datacenter(&mut document, field, "thumbprint", Value::from(v.as_str()))?
            }
            Self::AllMachines(filler) => {
                for machine in document.of_kind_mut(VSPHERE_MACHINE_CONFIG_KIND) {
                    filler.fill_machine(machine)?;
                }
            }
            Self::MachineConfig { name, fillers } => {
                Self::fill_named_machine(&mut document, name, fillers)?
            }
        }
        Ok(document)
    }
}
