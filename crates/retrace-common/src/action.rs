use crate::protocol::{RawEvent, Timestamped};

/// A typed interaction reconstructed from one (possibly coalesced) event.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// `bid` of the element acted on.
    pub target_id: String,
    /// Time the action is placed at on the timeline. For fills this is the burst start.
    pub timestamp: f64,
    pub video_timestamp: f64,
    pub url: Option<String>,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Fill { value: String, end_timestamp: f64 },
    Click,
    /// Only produced by composite gestures (see the markup classification strategy).
    Press,
    SelectOption { option: String },
}

impl Action {
    fn from_event(event: &RawEvent, kind: ActionKind) -> Self {
        Self {
            target_id: event.target.bid.clone(),
            timestamp: event.timestamp,
            video_timestamp: event.video_timestamp,
            url: event.url.clone(),
            kind,
        }
    }

    /// A fill starts where its input burst started and ends at the event that closed it.
    pub fn fill(event: &RawEvent) -> Self {
        let mut action = Self::from_event(
            event,
            ActionKind::Fill {
                value: event.target.value.clone().unwrap_or_default(),
                end_timestamp: event.timestamp,
            },
        );
        action.timestamp = event.start_timestamp.unwrap_or(event.timestamp);
        action
    }

    pub fn click(event: &RawEvent) -> Self {
        Self::from_event(event, ActionKind::Click)
    }

    pub fn press(event: &RawEvent) -> Self {
        Self::from_event(event, ActionKind::Press)
    }

    pub fn select_option(event: &RawEvent) -> Self {
        Self::from_event(
            event,
            ActionKind::SelectOption {
                option: event.target.value.clone().unwrap_or_default(),
            },
        )
    }

    /// Snake-case name used on the wire.
    pub fn name(&self) -> &'static str {
        match self.kind {
            ActionKind::Fill { .. } => "fill",
            ActionKind::Click => "click",
            ActionKind::Press => "press",
            ActionKind::SelectOption { .. } => "select_option",
        }
    }

    /// Completion time. Equal to `timestamp` for everything but fills.
    pub fn end_timestamp(&self) -> f64 {
        match self.kind {
            ActionKind::Fill { end_timestamp, .. } => end_timestamp,
            _ => self.timestamp,
        }
    }
}

impl Timestamped for Action {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}
