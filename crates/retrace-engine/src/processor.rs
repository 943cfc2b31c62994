//! Per-document and batch processing against the external stores.
//!
//! For each document: fetch → reconstruct → resolve HTML → project → write.
//! Records are written in one call only after every earlier stage succeeded,
//! so an abandoned or failed document leaves nothing behind.

use crate::builder::{BlobError, TrajectoryBuilder, TrajectoryStep};
use crate::config::RetraceConfig;
use crate::projection::{AxTreeError, StepProjector};
use crate::retry::RetryPolicy;
use crate::store::{AxTreeGenerator, BlobStore, DocumentStore, StepSink, StoreError};
use futures::stream::{self, StreamExt};
use retrace_common::protocol::RawDocument;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to query documents: {0}")]
    Query(#[source] StoreError),

    #[error("Failed to fetch document {id}: {source}")]
    Fetch {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Document {id}: {source}")]
    Blob {
        id: String,
        #[source]
        source: BlobError,
    },

    #[error("Document {id}: {source}")]
    AxTree {
        id: String,
        #[source]
        source: AxTreeError,
    },

    #[error("Failed to write steps for document {id}: {source}")]
    Write {
        id: String,
        #[source]
        source: StoreError,
    },
}

/// The external stores a processor talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub axtree: Arc<dyn AxTreeGenerator>,
    pub sink: Arc<dyn StepSink>,
}

/// Which documents a batch covers.
#[derive(Debug, Clone)]
pub enum Selection {
    Ids(Vec<String>),
    /// Documents captured after an RFC 3339 timestamp.
    Since(String),
    StartUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Written { steps: usize },
    /// Nothing survived reconstruction and projection; nothing was written.
    Skipped,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<(String, usize)>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, ProcessError)>,
}

impl BatchReport {
    pub fn total_steps(&self) -> usize {
        self.written.iter().map(|(_, n)| n).sum()
    }
}

pub struct DocumentProcessor {
    stores: Collaborators,
    builder: TrajectoryBuilder,
    projector: StepProjector,
    retry: RetryPolicy,
    concurrency: usize,
    axtree_concurrency: usize,
}

impl DocumentProcessor {
    pub fn new(stores: Collaborators, config: &RetraceConfig) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        Self {
            stores,
            builder: TrajectoryBuilder::with_kind(config.pipeline.classifier),
            projector: StepProjector::new(retry.clone(), config.axtree.concurrency),
            retry,
            concurrency: config.pipeline.concurrency.max(1),
            axtree_concurrency: config.axtree.concurrency,
        }
    }

    pub fn with_builder(mut self, builder: TrajectoryBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.projector = StepProjector::new(retry.clone(), self.axtree_concurrency);
        self.retry = retry;
        self
    }

    /// Resolve a selection to document ids.
    pub async fn select(&self, selection: &Selection) -> Result<Vec<String>, ProcessError> {
        let documents = &self.stores.documents;
        match selection {
            Selection::Ids(ids) => Ok(ids.clone()),
            Selection::Since(since) => self
                .retry
                .run("query by recency", || documents.ids_since(since))
                .await
                .map_err(ProcessError::Query),
            Selection::StartUrl(url) => self
                .retry
                .run("query by start url", || documents.ids_by_start_url(url))
                .await
                .map_err(ProcessError::Query),
        }
    }

    async fn fetch(&self, id: &str) -> Result<RawDocument, ProcessError> {
        let documents = &self.stores.documents;
        self.retry
            .run(&format!("fetch {}", id), || documents.get_by_id(id))
            .await
            .map_err(|source| ProcessError::Fetch {
                id: id.to_string(),
                source,
            })
    }

    async fn fetch_and_build(
        &self,
        id: &str,
    ) -> Result<(RawDocument, Vec<TrajectoryStep>), ProcessError> {
        let document = self.fetch(id).await?;
        let steps = self
            .builder
            .build(&document, self.stores.blobs.as_ref(), &self.retry)
            .await
            .map_err(|source| ProcessError::Blob {
                id: id.to_string(),
                source,
            })?;
        Ok((document, steps))
    }

    /// Reconstructed and enriched trajectory of one document. Writes nothing.
    pub async fn trajectory(&self, id: &str) -> Result<Vec<TrajectoryStep>, ProcessError> {
        let (_, steps) = self.fetch_and_build(id).await?;
        Ok(steps)
    }

    /// Process one document end to end.
    pub async fn process_document(&self, id: &str) -> Result<Outcome, ProcessError> {
        let (document, steps) = self.fetch_and_build(id).await?;

        let records = self
            .projector
            .project(&document, &steps, self.stores.axtree.as_ref())
            .await
            .map_err(|source| ProcessError::AxTree {
                id: id.to_string(),
                source,
            })?;

        if records.is_empty() {
            info!("{}: no steps reconstructed, skipping", id);
            return Ok(Outcome::Skipped);
        }

        let sink = &self.stores.sink;
        self.retry
            .run(&format!("write {}", id), || sink.insert_many(&records))
            .await
            .map_err(|source| ProcessError::Write {
                id: id.to_string(),
                source,
            })?;

        info!(
            "{}: wrote {} of {} reconstructed steps",
            id,
            records.len(),
            steps.len()
        );
        Ok(Outcome::Written {
            steps: records.len(),
        })
    }

    /// Process many documents, a bounded number at a time.
    /// A failing document is recorded in the report and never stops the batch.
    pub async fn process_batch(&self, ids: &[String]) -> BatchReport {
        let results: Vec<(String, Result<Outcome, ProcessError>)> = stream::iter(ids)
            .map(|id| async move { (id.clone(), self.process_document(id).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (id, result) in results {
            match result {
                Ok(Outcome::Written { steps }) => report.written.push((id, steps)),
                Ok(Outcome::Skipped) => report.skipped.push(id),
                Err(e) => {
                    warn!("{}", e);
                    report.failed.push((id, e));
                }
            }
        }

        info!(
            "Batch done: {} written ({} steps), {} skipped, {} failed",
            report.written.len(),
            report.total_steps(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }
}
