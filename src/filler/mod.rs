//! Filler pipeline
//!
//! A filler is one narrow mutation of a configuration [`Document`]: it sets a
//! single field (or no-ops) and hands the document back. A scenario is an
//! ordered list of fillers folded over a baseline document, so a later filler
//! targeting the same field as an earlier one wins.
//!
//! # Example
//!
//! ```ignore
//! use vsphere_e2e::filler::{apply, ProviderFiller, MachineFiller};
//!
//! let fillers = vec![
//!     ProviderFiller::Datacenter("DC1".into()),
//!     ProviderFiller::for_all_machines(MachineFiller::Template("ubuntu-1.22".into())),
//! ];
//! let customized = apply(document, &fillers)?;
//! ```

mod cluster;
mod vsphere;

pub use cluster::{ClusterFiller, MachineConfigRef, WorkerNodeGroup, CONTROL_PLANE_ENDPOINT_FIELD};
pub use vsphere::{
    MachineFiller, OsFamily, ProviderFiller, DEFAULT_DISK_GIB, DEFAULT_MEMORY_MIB,
    DEFAULT_NUM_CPUS, DEFAULT_SSH_USER,
};

use tracing::{debug, info};

use crate::document::{Document, DocumentSource, CLUSTER_KINDS, PROVIDER_KINDS};
use crate::Result;

/// A single step of the pipeline
pub trait Filler {
    /// Field this step sets, for logs and errors (e.g. "spec.datacenter")
    fn field(&self) -> &'static str;

    /// Consume the document and return the filled one
    fn fill(&self, document: Document) -> Result<Document>;
}

/// Apply `fillers` to `document` strictly in order.
///
/// The first failing filler aborts the pass and the partially filled document
/// is dropped. An empty list returns the input unchanged.
pub fn apply<F: Filler>(document: Document, fillers: &[F]) -> Result<Document> {
    fillers.iter().try_fold(document, |document, filler| {
        debug!(field = filler.field(), "Applying filler");
        filler.fill(document)
    })
}

/// Load `source`, apply provider fillers, and emit the provider manifests.
pub fn autofill_provider(
    source: DocumentSource<'_>,
    fillers: &[ProviderFiller],
) -> Result<Vec<u8>> {
    autofill(source, fillers, PROVIDER_KINDS)
}

/// Load `source`, apply cluster fillers, and emit the cluster manifest.
pub fn autofill_cluster(source: DocumentSource<'_>, fillers: &[ClusterFiller]) -> Result<Vec<u8>> {
    autofill(source, fillers, CLUSTER_KINDS)
}

fn autofill<F: Filler>(
    source: DocumentSource<'_>,
    fillers: &[F],
    kinds: &[&str],
) -> Result<Vec<u8>> {
    let document = source.load()?;
    let filled = apply(document, fillers)?;
    info!(
        source = %source.describe(),
        fillers = fillers.len(),
        "Customized configuration document"
    );
    Ok(filled.select(kinds).to_yaml()?.into_bytes())
}
