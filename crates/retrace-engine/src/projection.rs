//! Projection of enriched trajectory steps into training records.

use crate::builder::TrajectoryStep;
use crate::retry::RetryPolicy;
use crate::store::{AxTreeGenerator, AxTreeOutput, StoreError};
use regex::Regex;
use retrace_common::protocol::RawDocument;
use retrace_common::record::{ActionRecord, StepRecord};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::warn;

static BID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(?:data-)?bid\s*=\s*["']([^"']*)["']"#).unwrap());

/// Every `bid` / `data-bid` attribute value present in `html`.
pub fn element_ids(html: &str) -> HashSet<&str> {
    BID_ATTR
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

#[derive(Debug, Error)]
#[error("Accessibility tree generation failed for step {step}: {source}")]
pub struct AxTreeError {
    pub step: usize,
    #[source]
    pub source: StoreError,
}

/// Build the record for one step, or return the element ids missing from the
/// canonical HTML.
pub fn to_record(
    step_number: usize,
    document: &RawDocument,
    step: &TrajectoryStep,
    generated: AxTreeOutput,
) -> Result<StepRecord, Vec<String>> {
    let known = element_ids(&generated.html);
    let missing: Vec<String> = step
        .actions
        .iter()
        .filter(|a| !known.contains(a.target_id.as_str()))
        .map(|a| a.target_id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    Ok(StepRecord {
        step: step_number,
        task_description: document.task_description.clone().unwrap_or_default(),
        bid: step.actions.iter().map(|a| a.target_id.clone()).collect(),
        action: step.actions.iter().map(ActionRecord::from).collect(),
        video_timestamp: step.actions.iter().map(|a| a.video_timestamp).collect(),
        axtree: generated.axtree,
        raw_data_id: document.id.clone(),
    })
}

/// Turns a trajectory into step records, calling the tree generator once per step.
#[derive(Clone)]
pub struct StepProjector {
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl StepProjector {
    /// `concurrency` caps generator calls in flight across every clone of this projector.
    pub fn new(retry: RetryPolicy, concurrency: usize) -> Self {
        Self {
            retry,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Records are numbered contiguously; steps whose targets cannot be found
    /// in the canonical HTML are logged and left out.
    pub async fn project<G: AxTreeGenerator + ?Sized>(
        &self,
        document: &RawDocument,
        steps: &[TrajectoryStep],
        generator: &G,
    ) -> Result<Vec<StepRecord>, AxTreeError> {
        let mut records = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let generated = {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|e| AxTreeError {
                        step: index,
                        source: StoreError::Other(e.to_string()),
                    })?;
                let context = format!("{} step {}", document.id, index);
                self.retry
                    .run(&context, || generator.generate(&step.observation.html))
                    .await
                    .map_err(|source| AxTreeError {
                        step: index,
                        source,
                    })?
            };

            match to_record(records.len(), document, step, generated) {
                Ok(record) => records.push(record),
                Err(missing) => warn!(
                    "{}: skipping step {}, unresolved element ids {:?}",
                    document.id, index, missing
                ),
            }
        }
        Ok(records)
    }
}
