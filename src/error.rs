//! Error types for the e2e configuration framework
//!
//! Every failure surfaces synchronously to the test that owns the harness.
//! Nothing here is retried: an error means the environment is misconfigured,
//! not that a transient condition occurred.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for harness operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Required environment variables are unset or empty
    #[error("required environment variables not set: {}", vars.join(", "))]
    MissingEnvVars {
        /// Every missing variable, in declaration order
        vars: Vec<String>,
    },

    /// A document or kubeconfig could not be parsed
    #[error("failed to decode {what}: {message}")]
    Decode {
        /// What was being decoded (e.g. "cluster config", "kubeconfig /tmp/kc")
        what: String,
        /// Parser message
        message: String,
    },

    /// A filler's target structure is absent from the document
    #[error("cannot set {field}: {target}")]
    MissingTarget {
        /// Field the filler sets (e.g. "spec.datacenter")
        field: String,
        /// Description of what is missing
        target: String,
    },

    /// The shared IP pool has no addresses left
    #[error("IP pool {pool} is exhausted")]
    PoolExhausted {
        /// Environment variable naming the pool
        pool: String,
    },

    /// Every host address in the CIDR is in use
    #[error("no free address left in {cidr}")]
    ProbeExhausted {
        /// The scanned block
        cidr: String,
    },

    /// The reachability probe failed for a candidate address
    #[error("probing {address} failed: {message}")]
    Probe {
        /// Candidate address
        address: String,
        /// Underlying failure
        message: String,
    },

    /// A CIDR block could not be parsed
    #[error("invalid CIDR block '{cidr}': {message}")]
    InvalidCidr {
        /// The offending input
        cidr: String,
        /// Parser message
        message: String,
    },

    /// An IP pool entry is not a valid IPv4 address
    #[error("invalid address '{address}' in IP pool {pool}")]
    InvalidPoolAddress {
        /// Environment variable naming the pool
        pool: String,
        /// The offending entry
        address: String,
    },

    /// A kubeconfig declares no clusters
    #[error("kubeconfig {} declares no clusters", path.display())]
    NoClusters {
        /// Path of the kubeconfig
        path: PathBuf,
    },

    /// Serializing a document back to YAML failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The requested file is not tracked by the git working tree
    #[error("{} is not tracked in git repository {}", path.display(), repo.display())]
    UntrackedFile {
        /// Repository root
        repo: PathBuf,
        /// Path relative to the repository root
        path: PathBuf,
    },

    /// The git repository has no working tree
    #[error("git repository {} has no working tree", repo.display())]
    BareRepository {
        /// Repository path
        repo: PathBuf,
    },

    /// A git-sourced customization was requested for a scenario without a repository
    #[error("cluster {cluster} has no git repository configured")]
    NoGitRepository {
        /// Cluster name of the scenario
        cluster: String,
    },

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Git error
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl Error {
    /// Create a decode error for the named input
    pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create a pipeline error for a filler whose target is absent
    pub fn missing_target(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self::MissingTarget {
            field: field.into(),
            target: target.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a probe error for a candidate address
    pub fn probe(address: impl ToString, message: impl Into<String>) -> Self {
        Self::Probe {
            address: address.to_string(),
            message: message.into(),
        }
    }
}
