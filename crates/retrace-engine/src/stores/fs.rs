use crate::store::{BlobStore, DocumentStore, StepSink, StoreError};
use async_trait::async_trait;
use retrace_common::protocol::RawDocument;
use retrace_common::record::StepRecord;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Reject keys that would escape the store root.
fn relative_path(key: &str) -> Result<PathBuf, StoreError> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(path.to_path_buf())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

async fn read_string(path: &Path, what: &str) -> Result<String, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(what.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Raw documents stored as `<root>/<id>.json`.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let file = relative_path(&format!("{}.json", id))?;
        if file.components().count() != 1 {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        Ok(self.root.join(file))
    }

    /// Every readable document under the root. Unparsable files are skipped.
    async fn load_all(&self) -> Result<Vec<RawDocument>, StoreError> {
        let pattern = self.root.join("*.json");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| StoreError::InvalidKey(pattern.display().to_string()))?;

        let mut documents = Vec::new();
        for entry in glob::glob(pattern).map_err(|e| StoreError::Other(e.to_string()))? {
            let path = entry.map_err(|e| StoreError::Io(e.into()))?;
            let parsed = tokio::fs::read_to_string(&path)
                .await
                .map_err(StoreError::from)
                .and_then(|content| Ok(serde_json::from_str::<RawDocument>(&content)?));
            match parsed {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!("Skipping unreadable document {:?}: {}", path, e),
            }
        }
        debug!("Loaded {} documents from {:?}", documents.len(), self.root);
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn get_by_id(&self, id: &str) -> Result<RawDocument, StoreError> {
        let path = self.path_for(id)?;
        let content = read_string(&path, id).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn ids_since(&self, since: &str) -> Result<Vec<String>, StoreError> {
        let mut recent: Vec<(String, String)> = self
            .load_all()
            .await?
            .into_iter()
            .filter_map(|doc| match doc.timestamp {
                Some(ts) if ts.as_str() > since => Some((ts, doc.id)),
                _ => None,
            })
            .collect();
        recent.sort();
        Ok(recent.into_iter().map(|(_, id)| id).collect())
    }

    async fn ids_by_start_url(&self, start_url: &str) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|doc| doc.start_url.as_deref() == Some(start_url))
            .map(|doc| doc.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// Out-of-band HTML stored under a local root.
///
/// URL keys (`https://bucket.host/captures/a.html`, `s3://bucket/captures/a.html`)
/// resolve by their path, so a mirrored bucket can be read from disk.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = match Url::parse(key) {
            Ok(url) if url.has_host() => url.path().trim_start_matches('/').to_string(),
            _ => key.to_string(),
        };
        Ok(self.root.join(relative_path(&relative)?))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn fetch(&self, key: &str) -> Result<String, StoreError> {
        let path = self.resolve(key)?;
        read_string(&path, key).await
    }
}

/// Cut the file back to `start` when `result` is an error, so a retried
/// write never leaves a partial batch behind.
async fn rollback_on_error<T>(
    file: &mut tokio::fs::File,
    start: u64,
    result: std::io::Result<T>,
) -> std::io::Result<T> {
    if result.is_err()
        && let Err(e) = file.set_len(start).await
    {
        warn!("Failed to roll back partial write: {}", e);
    }
    result
}

/// Appends step records to a JSON-lines file, one write per document.
pub struct JsonlStepSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlStepSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StepSink for JsonlStepSink {
    async fn insert_many(&self, records: &[StepRecord]) -> Result<(), StoreError> {
        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let start = file.metadata().await?.len();
        let written = async {
            file.write_all(buf.as_bytes()).await?;
            file.flush().await
        }
        .await;
        rollback_on_error(&mut file, start, written).await?;
        Ok(())
    }
}
