//! Per-stack advisory locks.
//!
//! Two actions against the same compose directory race inside Docker, so the
//! sequencer holds an exclusive `flock` for the stack while it runs. The lock
//! file lives outside the stack directory, named after a hash of the
//! canonical stack path, so it also serializes separate processes.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::adapters::resolve_working_dir;
use crate::error::{FlowError, Result};

/// Directory of stack lock files
#[derive(Debug, Clone)]
pub struct StackLocks {
    dir: PathBuf,
}

/// Held lock; released on drop
#[derive(Debug)]
pub struct StackGuard {
    file: File,
    path: PathBuf,
}

impl StackGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release stack lock");
        }
    }
}

/// Lock file name for a canonical stack path
pub fn lock_file_name(canonical: &Path) -> String {
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    format!("{}.lock", &hex::encode(digest)[..16])
}

impl StackLocks {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lock file used for `stack_dir`
    pub fn lock_path(&self, stack_dir: &Path) -> Result<PathBuf> {
        let canonical = resolve_working_dir(stack_dir)?;
        Ok(self.dir.join(lock_file_name(&canonical)))
    }

    /// Block until the stack in `stack_dir` is exclusively ours.
    pub async fn acquire(&self, stack_dir: &Path) -> Result<StackGuard> {
        let path = self.lock_path(stack_dir)?;
        let lock_err = |source| FlowError::Lock {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(lock_err)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(lock_err)?;

        if file.try_lock_exclusive().is_err() {
            info!(
                stack = %stack_dir.display(),
                lock = %path.display(),
                "Stack busy, waiting for lock"
            );
            let file = tokio::task::spawn_blocking(move || file.lock_exclusive().map(|_| file))
                .await
                .map_err(|e| lock_err(std::io::Error::other(e)))?
                .map_err(lock_err)?;
            debug!(lock = %path.display(), "Stack lock acquired after wait");
            return Ok(StackGuard { file, path });
        }

        debug!(lock = %path.display(), "Stack lock acquired");
        Ok(StackGuard { file, path })
    }
}
