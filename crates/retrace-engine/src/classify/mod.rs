//! Event → action classification.
//!
//! A strategy turns one coalesced event into the actions it stands for. The
//! default [`TagStrategy`] always yields exactly one action; [`MarkupStrategy`]
//! can yield a composite gesture or nothing at all.

pub mod markup;
pub mod tag;

pub use markup::{MarkupStrategy, TargetType, target_type};
pub use tag::TagStrategy;

use retrace_common::action::Action;
use retrace_common::protocol::RawEvent;
use serde::{Deserialize, Serialize};

pub trait ClassificationStrategy: Send + Sync {
    /// Actions for one event, in time order. An empty list drops the event.
    fn classify(&self, event: &RawEvent) -> Vec<Action>;
}

/// Strategy selector, as named in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Tag,
    Markup,
}

impl ClassifierKind {
    pub fn strategy(self) -> Box<dyn ClassificationStrategy> {
        match self {
            ClassifierKind::Tag => Box::new(TagStrategy),
            ClassifierKind::Markup => Box::new(MarkupStrategy),
        }
    }
}
