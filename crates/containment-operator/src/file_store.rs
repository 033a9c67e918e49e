//! Directory-backed intent store
//!
//! One document per intent, named `<namespace>.<name>.yaml` (or `.json`).
//! Status writes are conditional on `metadata.resourceVersion` and replace
//! the file atomically through a temporary file in the same directory.

use async_trait::async_trait;
use containment_core::error::StoreError;
use containment_core::store::IntentStore;
use containment_core::types::{ContainmentIntent, ContainmentStatus, IntentId};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// On-disk document encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl DocumentFormat {
    /// Format implied by a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Canonical extension
    #[inline]
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    /// Decode an intent document
    ///
    /// # Errors
    /// - `StoreError::Codec` if the document is malformed
    pub fn decode(self, raw: &str) -> Result<ContainmentIntent, StoreError> {
        match self {
            Self::Yaml => serde_yaml::from_str(raw).map_err(|e| StoreError::Codec(e.to_string())),
            Self::Json => serde_json::from_str(raw).map_err(|e| StoreError::Codec(e.to_string())),
        }
    }

    /// Encode an intent document
    ///
    /// # Errors
    /// - `StoreError::Codec` if serialization fails
    pub fn encode(self, intent: &ContainmentIntent) -> Result<String, StoreError> {
        match self {
            Self::Yaml => {
                serde_yaml::to_string(intent).map_err(|e| StoreError::Codec(e.to_string()))
            }
            Self::Json => serde_json::to_string_pretty(intent)
                .map(|mut doc| {
                    doc.push('\n');
                    doc
                })
                .map_err(|e| StoreError::Codec(e.to_string())),
        }
    }
}

/// Read and decode one intent file
///
/// # Errors
/// - `StoreError::Codec` for an unsupported extension or malformed document
/// - `StoreError::Backend` if the file cannot be read
pub fn read_intent_file(path: &Path) -> Result<ContainmentIntent, StoreError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        StoreError::Codec(format!("{}: expected a .yaml or .json file", path.display()))
    })?;
    let raw = std::fs::read_to_string(path).map_err(|e| backend(path, &e))?;
    format.decode(&raw)
}

fn backend(path: &Path, err: &std::io::Error) -> StoreError {
    StoreError::Backend(format!("{}: {err}", path.display()))
}

#[derive(Debug)]
struct Inner {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl Inner {
    fn locate(&self, id: &IntentId) -> Option<(PathBuf, DocumentFormat)> {
        [DocumentFormat::Yaml, DocumentFormat::Json]
            .into_iter()
            .map(|format| (self.path_for(id, format), format))
            .find(|(path, _)| path.is_file())
    }

    fn path_for(&self, id: &IntentId, format: DocumentFormat) -> PathBuf {
        self.dir
            .join(format!("{}.{}.{}", id.namespace, id.name, format.extension()))
    }

    fn read(&self, id: &IntentId) -> Result<Option<ContainmentIntent>, StoreError> {
        let Some((path, format)) = self.locate(id) else {
            return Ok(None);
        };
        let raw = std::fs::read_to_string(&path).map_err(|e| backend(&path, &e))?;
        let intent = format.decode(&raw)?;
        if intent.id() != *id {
            return Err(StoreError::Codec(format!(
                "{} declares intent {}",
                path.display(),
                intent.id()
            )));
        }
        Ok(Some(intent))
    }

    fn write(
        &self,
        path: &Path,
        format: DocumentFormat,
        intent: &ContainmentIntent,
    ) -> Result<(), StoreError> {
        let doc = format.encode(intent)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".intent-")
            .tempfile_in(&self.dir)
            .map_err(|e| backend(&self.dir, &e))?;
        tmp.write_all(doc.as_bytes()).map_err(|e| backend(tmp.path(), &e))?;
        tmp.as_file().sync_all().map_err(|e| backend(tmp.path(), &e))?;
        tmp.persist(path).map_err(|e| backend(path, &e.error))?;
        Ok(())
    }

    fn update_status(
        &self,
        id: &IntentId,
        expected_version: u64,
        status: ContainmentStatus,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock();
        let (path, format) = self
            .locate(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let mut intent = self.read(id)?.ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let found = intent.version();
        if found != expected_version {
            return Err(StoreError::Conflict {
                id: id.clone(),
                expected: expected_version,
                found,
            });
        }

        intent.status = status;
        intent.metadata.resource_version += 1;
        self.write(&path, format, &intent)?;
        Ok(intent.metadata.resource_version)
    }

    fn put(
        &self,
        mut intent: ContainmentIntent,
        format: DocumentFormat,
    ) -> Result<IntentId, StoreError> {
        let _guard = self.write_lock.lock();
        let id = intent.id();
        if let Some(existing) = self.read(&id)? {
            intent.metadata.resource_version = existing.version() + 1;
        }
        let path = self.path_for(&id, format);
        self.write(&path, format, &intent)?;
        // Drop a copy left under the other extension
        for other in [DocumentFormat::Yaml, DocumentFormat::Json] {
            let stale = self.path_for(&id, other);
            if other != format && stale.is_file() {
                std::fs::remove_file(&stale).map_err(|e| backend(&stale, &e))?;
            }
        }
        Ok(id)
    }

    fn list(&self) -> Result<Vec<IntentId>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| backend(&self.dir, &e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| backend(&self.dir, &e))?.path();
            if let Some(id) = id_from_path(&path) {
                ids.push(id);
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

/// Intent id encoded in a store file name
fn id_from_path(path: &Path) -> Option<IntentId> {
    DocumentFormat::from_path(path)?;
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') {
        return None;
    }
    let (namespace, name) = stem.split_once('.')?;
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    Some(IntentId::new(namespace, name))
}

/// Intent store over a directory of documents
#[derive(Debug, Clone)]
pub struct FileIntentStore {
    inner: Arc<Inner>,
}

impl FileIntentStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    /// - `StoreError::Backend` if the directory cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| backend(&dir, &e))?;
        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Write an intent document, bumping the version of any existing one
    ///
    /// # Errors
    /// - `StoreError::Backend`/`Codec` if the document cannot be written
    pub async fn put(
        &self,
        intent: ContainmentIntent,
        format: DocumentFormat,
    ) -> Result<IntentId, StoreError> {
        let inner = Arc::clone(&self.inner);
        blocking(move || inner.put(intent, format)).await
    }

    /// Decode every document in the directory, keeping per-file failures
    ///
    /// # Errors
    /// - `StoreError::Backend` if the directory cannot be listed
    pub async fn scan(
        &self,
    ) -> Result<Vec<(PathBuf, Result<ContainmentIntent, StoreError>)>, StoreError> {
        let inner = Arc::clone(&self.inner);
        blocking(move || {
            let entries = std::fs::read_dir(&inner.dir).map_err(|e| backend(&inner.dir, &e))?;
            let mut docs = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| backend(&inner.dir, &e))?.path();
                if id_from_path(&path).is_some() {
                    let doc = read_intent_file(&path);
                    docs.push((path, doc));
                }
            }
            docs.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(docs)
        })
        .await
    }
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Backend(format!("store task failed: {e}")))?
}

#[async_trait]
impl IntentStore for FileIntentStore {
    async fn get(&self, id: &IntentId) -> Result<Option<ContainmentIntent>, StoreError> {
        let inner = Arc::clone(&self.inner);
        let id = id.clone();
        blocking(move || inner.read(&id)).await
    }

    async fn update_status(
        &self,
        id: &IntentId,
        expected_version: u64,
        status: ContainmentStatus,
    ) -> Result<u64, StoreError> {
        let inner = Arc::clone(&self.inner);
        let id = id.clone();
        blocking(move || inner.update_status(&id, expected_version, status)).await
    }

    async fn list(&self) -> Result<Vec<IntentId>, StoreError> {
        let inner = Arc::clone(&self.inner);
        blocking(move || inner.list()).await
    }
}
