use super::ClassificationStrategy;
use retrace_common::action::Action;
use retrace_common::protocol::{EventKind, RawEvent};

const DROPDOWN_TERMS: &[&str] = &[
    "<select",
    "<option",
    "dropdown",
    "role=\"listbox\"",
    "role=\"menu\"",
];

const COMBOBOX_TERMS: &[&str] = &[
    "combobox",
    "combo-box",
    "role=\"combobox\"",
    "aria-autocomplete",
    "aria-haspopup=\"listbox\"",
    "autocomplete",
];

/// Widget family guessed from an element's serialized markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Plain,
    Dropdown,
    Combobox,
    AriaCombobox,
}

/// Sniff the widget family from lowercased outer HTML.
pub fn target_type(target_html: &str) -> TargetType {
    let contains_any = |terms: &[&str]| terms.iter().any(|t| target_html.contains(t));

    if !contains_any(DROPDOWN_TERMS) {
        TargetType::Plain
    } else if !contains_any(COMBOBOX_TERMS) {
        TargetType::Dropdown
    } else if !target_html.contains("aria") {
        TargetType::Combobox
    } else {
        TargetType::AriaCombobox
    }
}

/// Classifies by event type, refining clicks with the target's markup.
///
/// ARIA comboboxes need a key press to open before the option can be clicked,
/// so a click on one becomes `[press, click]`. Event types other than
/// click/submit/input yield no action.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupStrategy;

impl ClassificationStrategy for MarkupStrategy {
    fn classify(&self, event: &RawEvent) -> Vec<Action> {
        match event.kind {
            EventKind::Click => {
                let html = event
                    .target
                    .outer_html
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase();
                match target_type(&html) {
                    TargetType::Dropdown => vec![Action::select_option(event)],
                    TargetType::AriaCombobox => vec![Action::press(event), Action::click(event)],
                    TargetType::Plain | TargetType::Combobox => vec![Action::click(event)],
                }
            }
            EventKind::Submit => vec![Action::click(event)],
            EventKind::Input => vec![Action::fill(event)],
            EventKind::Other => vec![],
        }
    }
}
