use crate::error::RecordError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Record type tag used by DOM snapshot records.
pub const HTML_CAPTURE: &str = "htmlCapture";

/// Custom deserializer for document ids.
/// Documents exported from Mongo carry `{"$oid": "..."}` instead of a plain string.
fn deserialize_document_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DocumentId {
        Plain(String),
        ObjectId {
            #[serde(rename = "$oid")]
            oid: String,
        },
    }

    Ok(match DocumentId::deserialize(deserializer)? {
        DocumentId::Plain(id) => id,
        DocumentId::ObjectId { oid } => oid,
    })
}

/// Anything placed on the session timeline.
pub trait Timestamped {
    fn timestamp(&self) -> f64;
}

/// One captured browsing session as stored in the raw-event store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(rename = "_id", deserialize_with = "deserialize_document_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    /// RFC 3339 capture time, used by recency queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Interleaved observation and event records, in capture order (not time order).
    #[serde(default)]
    pub data: Vec<Value>,
}

/// The two streams of a session log after partitioning by record kind.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub observations: Vec<RawObservation>,
    pub events: Vec<RawEvent>,
    /// Records that could not be read, with their position in `data`.
    pub skipped: Vec<(usize, RecordError)>,
}

impl RawDocument {
    /// Partition `data` into observations and events.
    /// Malformed records are skipped and reported, never fatal.
    pub fn split_log(&self) -> SessionLog {
        let mut log = SessionLog::default();
        for (index, value) in self.data.iter().enumerate() {
            match Record::from_value(value) {
                Ok(Record::Observation(obs)) => log.observations.push(obs),
                Ok(Record::Event(event)) => log.events.push(event),
                Err(e) => log.skipped.push((index, e)),
            }
        }
        log
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Observation(RawObservation),
    Event(RawEvent),
}

impl Record {
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(RecordError::MissingType)?;

        if kind == HTML_CAPTURE {
            let obs = RawObservation::deserialize(value).map_err(|source| {
                RecordError::Malformed {
                    kind: kind.to_string(),
                    source,
                }
            })?;
            if obs.html_source().is_none() {
                return Err(RecordError::MissingHtml);
            }
            Ok(Record::Observation(obs))
        } else {
            let event = RawEvent::deserialize(value).map_err(|source| RecordError::Malformed {
                kind: kind.to_string(),
                source,
            })?;
            Ok(Record::Event(event))
        }
    }
}

/// A DOM snapshot. The HTML is either inline or a reference to the blob store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub timestamp: f64,
    pub video_timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_file_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlSource<'a> {
    Inline(&'a str),
    /// Storage key or URL of an out-of-band payload.
    Stored(&'a str),
}

impl RawObservation {
    /// Inline HTML wins over a stored reference when both are present.
    pub fn html_source(&self) -> Option<HtmlSource<'_>> {
        match (&self.html, &self.html_file_url) {
            (Some(html), _) => Some(HtmlSource::Inline(html)),
            (None, Some(key)) => Some(HtmlSource::Stored(key)),
            (None, None) => None,
        }
    }
}

impl Timestamped for RawObservation {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// A user-interaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: f64,
    pub video_timestamp: f64,
    pub target: EventTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Start of the input burst this event closes. Set by coalescing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<f64>,
}

impl RawEvent {
    pub fn is_input(&self) -> bool {
        self.kind == EventKind::Input
    }

    pub fn bid(&self) -> &str {
        &self.target.bid
    }
}

impl Timestamped for RawEvent {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Click,
    Input,
    Submit,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTarget {
    pub tag: String,
    pub bid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(
        rename = "outerHTMLSnippet",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub outer_html: Option<String>,
}
