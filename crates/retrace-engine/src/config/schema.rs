use crate::classify::ClassifierKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetraceConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub axtree: AxTreeConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one `<id>.json` raw document per session.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
    /// Local root for out-of-band HTML. Ignored when `blob_base_url` is set.
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
    #[serde(default)]
    pub blob_base_url: Option<String>,
    /// JSON-lines file receiving processed step records.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            blob_dir: default_blob_dir(),
            blob_base_url: None,
            output_path: default_output_path(),
        }
    }
}

impl StoreConfig {
    pub fn blob_base_url(&self) -> Result<Option<Url>, url::ParseError> {
        self.blob_base_url.as_deref().map(Url::parse).transpose()
    }
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./data/raw")
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("./data/blobs")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./data/processed/steps.jsonl")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxTreeConfig {
    #[serde(default = "default_axtree_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_axtree_timeout_ms")]
    pub timeout_ms: u64,
    /// Generation calls allowed in flight at once.
    #[serde(default = "default_axtree_concurrency")]
    pub concurrency: usize,
}

impl Default for AxTreeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_axtree_endpoint(),
            timeout_ms: default_axtree_timeout_ms(),
            concurrency: default_axtree_concurrency(),
        }
    }
}

impl AxTreeConfig {
    pub fn endpoint_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.endpoint)
    }
}

fn default_axtree_endpoint() -> String {
    "http://127.0.0.1:8765/axtree".to_string()
}

fn default_axtree_timeout_ms() -> u64 {
    60000
}

fn default_axtree_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub classifier: ClassifierKind,
    /// Documents processed concurrently in a batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::default(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}
