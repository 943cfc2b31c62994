use async_trait::async_trait;
use retrace_common::protocol::RawDocument;
use retrace_common::record::StepRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use retrace_common::error::StoreError;

/// Output of accessibility-tree generation for one HTML snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxTreeOutput {
    pub axtree: Value,
    /// Canonicalised HTML, carrying the `bid` attributes the tree refers to.
    pub html: String,
}

/// Read access to raw session documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by its id.
    async fn get_by_id(&self, id: &str) -> Result<RawDocument, StoreError>;

    /// Ids of documents captured strictly after `since` (RFC 3339), oldest first.
    async fn ids_since(&self, since: &str) -> Result<Vec<String>, StoreError>;

    /// Ids of documents whose session started at `start_url`.
    async fn ids_by_start_url(&self, start_url: &str) -> Result<Vec<String>, StoreError>;
}

/// Out-of-band HTML payloads referenced by `html_file_url`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the payload stored under `key` (a storage key or a URL).
    async fn fetch(&self, key: &str) -> Result<String, StoreError>;
}

/// The black-box accessibility-tree service.
#[async_trait]
pub trait AxTreeGenerator: Send + Sync {
    async fn generate(&self, html: &str) -> Result<AxTreeOutput, StoreError>;
}

/// Destination of processed step records.
#[async_trait]
pub trait StepSink: Send + Sync {
    /// Write every record of one document in a single call.
    async fn insert_many(&self, records: &[StepRecord]) -> Result<(), StoreError>;
}
