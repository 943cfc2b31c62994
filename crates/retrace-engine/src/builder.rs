//! Trajectory reconstruction for one session document.
//!
//! Pipeline: split log → sort both streams → coalesce inputs → classify →
//! align → group by observation → resolve out-of-band HTML.

use crate::align::align;
use crate::classify::{ClassificationStrategy, ClassifierKind};
use crate::coalesce::coalesce_inputs;
use crate::retry::RetryPolicy;
use crate::store::{BlobStore, StoreError};
use retrace_common::action::Action;
use retrace_common::protocol::{HtmlSource, RawDocument, RawObservation, Timestamped};
use thiserror::Error;
use tracing::debug;

/// An observation whose HTML payload has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub raw: RawObservation,
    pub html: String,
}

impl Timestamped for Observation {
    fn timestamp(&self) -> f64 {
        self.raw.timestamp
    }
}

/// One observation and the actions performed against it, in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryStep<O = Observation> {
    pub observation: O,
    pub actions: Vec<Action>,
}

#[derive(Debug, Error)]
#[error("Failed to fetch HTML '{key}': {source}")]
pub struct BlobError {
    pub key: String,
    #[source]
    pub source: StoreError,
}

/// The actions one event classified into, aligned as a single unit.
struct ActionUnit(Vec<Action>);

impl Timestamped for ActionUnit {
    fn timestamp(&self) -> f64 {
        self.0[0].timestamp
    }
}

pub struct TrajectoryBuilder {
    strategy: Box<dyn ClassificationStrategy>,
}

impl Default for TrajectoryBuilder {
    fn default() -> Self {
        Self::with_kind(ClassifierKind::default())
    }
}

impl TrajectoryBuilder {
    pub fn new(strategy: Box<dyn ClassificationStrategy>) -> Self {
        Self { strategy }
    }

    pub fn with_kind(kind: ClassifierKind) -> Self {
        Self::new(kind.strategy())
    }

    /// Reconstruct the trajectory without resolving any HTML.
    pub fn reconstruct(&self, document: &RawDocument) -> Vec<TrajectoryStep<RawObservation>> {
        let mut log = document.split_log();
        for (index, error) in &log.skipped {
            debug!("{}: skipping record {}: {}", document.id, index, error);
        }

        log.observations
            .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        log.events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let events = coalesce_inputs(&log.events);
        let units: Vec<ActionUnit> = events
            .iter()
            .map(|event| self.strategy.classify(event))
            .filter(|actions| !actions.is_empty())
            .map(ActionUnit)
            .collect();

        let pairs = align(&log.observations, &units);

        // Each observation is paired at most once, so only the actions of a
        // single composite unit end up sharing a step.
        let mut steps: Vec<(usize, TrajectoryStep<RawObservation>)> = Vec::new();
        for pair in pairs {
            let actions = units[pair.action].0.clone();
            match steps.last_mut() {
                Some((obs_index, step)) if *obs_index == pair.observation => {
                    step.actions.extend(actions);
                }
                _ => steps.push((
                    pair.observation,
                    TrajectoryStep {
                        observation: log.observations[pair.observation].clone(),
                        actions,
                    },
                )),
            }
        }

        debug!(
            "{}: {} observations, {} events ({} after coalescing), {} steps",
            document.id,
            log.observations.len(),
            log.events.len(),
            events.len(),
            steps.len()
        );

        steps.into_iter().map(|(_, step)| step).collect()
    }

    /// Resolve each step's HTML, fetching stored payloads from `blobs`.
    pub async fn enrich<B: BlobStore + ?Sized>(
        &self,
        steps: Vec<TrajectoryStep<RawObservation>>,
        blobs: &B,
        retry: &RetryPolicy,
    ) -> Result<Vec<TrajectoryStep>, BlobError> {
        let mut enriched = Vec::with_capacity(steps.len());
        for step in steps {
            let html = match step.observation.html_source() {
                Some(HtmlSource::Inline(html)) => html.to_string(),
                Some(HtmlSource::Stored(key)) => retry
                    .run(key, || blobs.fetch(key))
                    .await
                    .map_err(|source| BlobError {
                        key: key.to_string(),
                        source,
                    })?,
                // Records without HTML are rejected while splitting the log.
                None => String::new(),
            };
            enriched.push(TrajectoryStep {
                observation: Observation {
                    raw: step.observation,
                    html,
                },
                actions: step.actions,
            });
        }
        Ok(enriched)
    }

    /// Reconstruct and enrich in one go.
    pub async fn build<B: BlobStore + ?Sized>(
        &self,
        document: &RawDocument,
        blobs: &B,
        retry: &RetryPolicy,
    ) -> Result<Vec<TrajectoryStep>, BlobError> {
        let steps = self.reconstruct(document);
        self.enrich(steps, blobs, retry).await
    }
}
