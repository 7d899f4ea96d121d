use super::errors::ProvisioningError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Scratch directory holding the session's clone.
///
/// Removed by [`release`](Self::release) on the normal path and by `Drop`
/// on every other path.
#[derive(Debug)]
pub struct ProvisioningWorkspace {
    root: TempDir,
}

impl ProvisioningWorkspace {
    pub fn acquire() -> Result<Self, ProvisioningError> {
        Self::create(None)
    }

    /// Acquire under `parent` instead of the system temp directory.
    pub fn acquire_in(parent: &Path) -> Result<Self, ProvisioningError> {
        Self::create(Some(parent))
    }

    fn create(parent: Option<&Path>) -> Result<Self, ProvisioningError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("audit-repo-cloner-");
        let root = match parent {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|source| ProvisioningError::Workspace { source })?;
        debug!(path = %root.path().display(), "Workspace acquired");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Directory the source repository is cloned into.
    pub fn checkout_dir(&self) -> PathBuf {
        self.root.path().join("checkout")
    }

    pub fn release(self) {
        let path = self.root.path().to_path_buf();
        match self.root.close() {
            Ok(()) => debug!(path = %path.display(), "Workspace removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove workspace"),
        }
    }
}
