//! Collapses keystroke-level `input` bursts into one logical fill event.

use retrace_common::protocol::RawEvent;

/// Collapse runs of consecutive `input` events on the same element.
///
/// Each run is replaced by its last event, stamped with `start_timestamp` set to
/// the time the run opened. Every other event passes through untouched. The input
/// must already be sorted by timestamp; the output keeps that order.
pub fn coalesce_inputs(events: &[RawEvent]) -> Vec<RawEvent> {
    let mut coalesced = Vec::with_capacity(events.len());
    let mut run_start: Option<f64> = None;

    for (i, event) in events.iter().enumerate() {
        if !event.is_input() {
            coalesced.push(event.clone());
            continue;
        }

        // An event coalesced earlier keeps the start of its first burst.
        let start = *run_start.get_or_insert(event.start_timestamp.unwrap_or(event.timestamp));

        let continues = events
            .get(i + 1)
            .is_some_and(|next| next.is_input() && next.bid() == event.bid());
        if continues {
            continue;
        }

        coalesced.push(RawEvent {
            start_timestamp: Some(start),
            ..event.clone()
        });
        run_start = None;
    }

    coalesced
}
