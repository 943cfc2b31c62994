//! Temporal alignment of actions to the observation that was current when they happened.

use retrace_common::protocol::Timestamped;

/// An aligned (observation, action) pair, as indices into the aligned slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub observation: usize,
    pub action: usize,
}

fn strictly_between(t: f64, lo: f64, hi: f64) -> bool {
    lo < t && t < hi
}

/// Pair each action with its tightest preceding observation.
///
/// Both slices must be sorted by timestamp. A pair `(o, a)` is emitted only when
/// `o` is earlier than `a`, no later observation precedes `a`, and the previous
/// action does not fall between them. Matching is one-to-one and both indices
/// only move forward: an action reached while the observation cursor is already
/// at or past it is dropped for good, even if the gap would later be satisfied.
pub fn align<O, A>(observations: &[O], actions: &[A]) -> Vec<Pair>
where
    O: Timestamped,
    A: Timestamped,
{
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < actions.len() && j < observations.len() {
        let obs_t = observations[j].timestamp();
        let act_t = actions[i].timestamp();

        if obs_t >= act_t {
            i += 1;
            continue;
        }

        let closer_obs = observations
            .get(j + 1)
            .is_some_and(|next| strictly_between(next.timestamp(), obs_t, act_t));
        let consumed = i
            .checked_sub(1)
            .and_then(|p| actions.get(p))
            .is_some_and(|prev| strictly_between(prev.timestamp(), obs_t, act_t));

        if closer_obs || consumed {
            j += 1;
        } else {
            pairs.push(Pair {
                observation: j,
                action: i,
            });
            i += 1;
            j += 1;
        }
    }

    pairs
}

/// Index of the last sorted timestamp strictly before `value`.
///
/// `Some(0)` is a real match; `None` means every timestamp is at or after `value`.
pub fn last_before(times: &[f64], value: f64) -> Option<usize> {
    times.partition_point(|t| *t < value).checked_sub(1)
}
