use crate::action::{Action, ActionKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One training record written to the processed-step store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub task_description: String,
    /// Target element ids, parallel to `action`.
    pub bid: Vec<String>,
    pub action: Vec<ActionRecord>,
    pub video_timestamp: Vec<f64>,
    pub axtree: Value,
    pub raw_data_id: String,
}

/// Wire form of an action. The element id lives in `StepRecord::bid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRecord {
    Fill { value: String },
    Click,
    Press,
    SelectOption { option: String },
}

impl From<&Action> for ActionRecord {
    fn from(action: &Action) -> Self {
        match &action.kind {
            ActionKind::Fill { value, .. } => ActionRecord::Fill {
                value: value.clone(),
            },
            ActionKind::Click => ActionRecord::Click,
            ActionKind::Press => ActionRecord::Press,
            ActionKind::SelectOption { option } => ActionRecord::SelectOption {
                option: option.clone(),
            },
        }
    }
}
