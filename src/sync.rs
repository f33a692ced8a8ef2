//! Remote artifact mirroring
//!
//! One operation: mirror a local directory to a remote path, best effort and
//! idempotent. The bucket is an external collaborator; the filesystem-backed
//! implementation below is the default target and the seam for real object
//! stores.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{NetGuardError, Result};

/// Destination for run artifacts
pub trait RemoteStore {
    /// Recursively mirror `local_dir` under `remote_path`.
    fn sync(&self, local_dir: &Path, remote_path: &str) -> Result<()>;
}

/// Bucket rooted in a local directory
#[derive(Debug, Clone)]
pub struct LocalBucketStore {
    root: PathBuf,
}

impl LocalBucketStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RemoteStore for LocalBucketStore {
    fn sync(&self, local_dir: &Path, remote_path: &str) -> Result<()> {
        if !local_dir.is_dir() {
            return Err(NetGuardError::Data(format!(
                "sync source {} is not a directory",
                local_dir.display()
            )));
        }
        let target = self.root.join(remote_path);
        copy_tree(local_dir, &target)?;
        info!(from = %local_dir.display(), to = %target.display(), "synced artifact directory");
        Ok(())
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&src, &dst)?;
        } else {
            std::fs::copy(&src, &dst)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mirrors_nested_tree_idempotently() {
        let local = tempfile::tempdir().unwrap();
        let bucket = tempfile::tempdir().unwrap();

        std::fs::create_dir_all(local.path().join("nested")).unwrap();
        std::fs::write(local.path().join("a.txt"), "a").unwrap();
        std::fs::write(local.path().join("nested/b.txt"), "b").unwrap();

        let store = LocalBucketStore::new(bucket.path());
        store.sync(local.path(), "artifacts/run_1").unwrap();
        // Second sync over the same tree must succeed unchanged
        store.sync(local.path(), "artifacts/run_1").unwrap();

        let mirrored = bucket.path().join("artifacts/run_1");
        assert_eq!(std::fs::read_to_string(mirrored.join("a.txt")).unwrap(), "a");
        assert_eq!(
            std::fs::read_to_string(mirrored.join("nested/b.txt")).unwrap(),
            "b"
        );
    }

    #[test]
    fn test_sync_missing_source_fails() {
        let bucket = tempfile::tempdir().unwrap();
        let store = LocalBucketStore::new(bucket.path());
        assert!(store.sync(Path::new("definitely/missing"), "x").is_err());
    }
}
