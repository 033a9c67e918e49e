//! Executor that realises containment as manifest files
//!
//! Each action writes the object it would create into an output directory
//! that a deployment pipeline (or `kubectl apply -f`) consumes.

use crate::manifest::{self, Manifest};
use async_trait::async_trait;
use containment_core::error::ExecutorError;
use containment_core::executor::ActionExecutor;
use containment_core::target::Target;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Writes rendered manifests under a directory
#[derive(Debug, Clone)]
pub struct ManifestExecutor {
    dir: PathBuf,
}

impl ManifestExecutor {
    /// Create executor writing into `dir`
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, manifest: &Manifest) -> PathBuf {
        self.dir.join(manifest.file_name())
    }

    async fn prepare(&self, manifest: &Manifest) -> Result<Vec<u8>, ExecutorError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, &e))?;
        let mut doc = serde_json::to_vec_pretty(manifest)
            .map_err(|e| ExecutorError::terminal(format!("cannot encode {manifest}: {e}")))?;
        doc.push(b'\n');
        Ok(doc)
    }

    /// Create the manifest; an existing one is an `already exists` error
    ///
    /// The document is staged in a temp file and linked into place only when
    /// complete, so a failed or interrupted write leaves nothing behind.
    async fn create(&self, manifest: &Manifest) -> Result<(), ExecutorError> {
        let doc = self.prepare(manifest).await?;
        let path = self.path_of(manifest);
        let mut tmp = tempfile::Builder::new()
            .prefix(".manifest-")
            .tempfile_in(&self.dir)
            .map_err(|e| io_error(&self.dir, &e))?;
        tmp.write_all(&doc).map_err(|e| io_error(tmp.path(), &e))?;
        tmp.as_file().sync_all().map_err(|e| io_error(tmp.path(), &e))?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                return Err(ExecutorError::already_exists(manifest));
            }
            Err(e) => return Err(io_error(&path, &e.error)),
        }
        tracing::info!(manifest = %manifest, path = %path.display(), "manifest created");
        Ok(())
    }

    /// Write the manifest, replacing any previous one
    async fn replace(&self, manifest: &Manifest) -> Result<(), ExecutorError> {
        let doc = self.prepare(manifest).await?;
        let path = self.path_of(manifest);
        tokio::fs::write(&path, doc)
            .await
            .map_err(|e| io_error(&path, &e))?;
        tracing::info!(manifest = %manifest, path = %path.display(), "manifest written");
        Ok(())
    }
}

fn io_error(path: &Path, err: &std::io::Error) -> ExecutorError {
    ExecutorError::retryable(format!("{}: {err}", path.display()))
}

#[async_trait]
impl ActionExecutor for ManifestExecutor {
    async fn isolate(&self, target: &Target) -> Result<(), ExecutorError> {
        self.create(&manifest::network_policy(target)).await
    }

    async fn evict(&self, target: &Target) -> Result<(), ExecutorError> {
        self.replace(&manifest::eviction(target)).await
    }

    async fn blackhole(&self, target: &Target) -> Result<(), ExecutorError> {
        self.create(&manifest::blackhole_virtual_service(target)).await
    }
}
