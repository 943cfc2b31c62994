use super::ClassificationStrategy;
use retrace_common::action::Action;
use retrace_common::protocol::RawEvent;

/// Classifies by the target element's tag name alone.
///
/// `SELECT` → select_option, `INPUT` → fill, anything else → click.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagStrategy;

impl TagStrategy {
    pub fn classify_one(event: &RawEvent) -> Action {
        match event.target.tag.as_str() {
            "SELECT" => Action::select_option(event),
            "INPUT" => Action::fill(event),
            _ => Action::click(event),
        }
    }
}

impl ClassificationStrategy for TagStrategy {
    fn classify(&self, event: &RawEvent) -> Vec<Action> {
        vec![Self::classify_one(event)]
    }
}
