//! Git working-tree lookups for upgrade scenarios that read tracked config files

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::debug;

use crate::{Error, Result};

/// Absolute path of `relative` inside the working tree of `repo`.
///
/// Fails when the repository is bare or the file is not in the index.
pub fn tracked_path(repo: &Path, relative: &Path) -> Result<PathBuf> {
    let repository = Repository::open(repo)?;
    let workdir = repository
        .workdir()
        .ok_or_else(|| Error::BareRepository {
            repo: repo.to_path_buf(),
        })?
        .to_path_buf();

    let index = repository.index()?;
    if index.get_path(relative, 0).is_none() {
        return Err(Error::UntrackedFile {
            repo: repo.to_path_buf(),
            path: relative.to_path_buf(),
        });
    }

    let full = workdir.join(relative);
    debug!(path = %full.display(), "Resolved tracked config file");
    Ok(full)
}

/// Path of a cluster's config file relative to the repository root
pub fn cluster_config_path(cluster_name: &str) -> PathBuf {
    Path::new("clusters")
        .join(cluster_name)
        .join(format!("{cluster_name}-cluster.yaml"))
}
