//! vsphere-e2e - configuration framework for vSphere end-to-end cluster tests
//!
//! Tests start from a baseline cluster config and turn it into a
//! scenario-specific one by folding an ordered list of fillers over it. Each
//! filler owns one narrow field. The control plane endpoint comes from a
//! unique IP allocator so concurrently running test clusters never share one.
//!
//! # Flow
//!
//! - [`VSphereHarness`] checks the environment and registers baseline fillers
//! - [`HarnessOption`]s append test-specific fillers after the baseline
//! - customization applies the fillers in order and emits document bytes
//! - the endpoint filler is appended last with an allocated address
//!
//! # Modules
//!
//! - [`filler`] - Filler pipeline and the vSphere/cluster filler catalogues
//! - [`provider`] - Provider trait and the vSphere scenario harness
//! - [`network`] - Unique endpoint IP allocation (shared pool or CIDR probe)
//! - [`document`] - Multi-document YAML configuration model
//! - [`cluster`] - Management cluster descriptor loaded from a kubeconfig
//! - [`scenario`] - Per-test cluster scenario state
//! - [`env`] - Environment snapshot and variable names
//! - [`git`] - Git working-tree lookups
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod cluster;
pub mod document;
pub mod env;
pub mod error;
pub mod filler;
pub mod git;
pub mod network;
pub mod provider;
pub mod scenario;

pub use error::Error;
pub use provider::{HarnessOption, OsTemplate, VSphereHarness};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
