use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagram::Message;

/// Activation period on a participant's lifeline, expressed as message
/// indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    pub start_index: usize,
    pub end_index: usize,
    /// Number of activations already open on the same lifeline when this
    /// one starts
    pub depth: usize,
}

/// Computes activation boxes for each participant.
///
/// Every non-return message opens an activation on its receiver. The
/// activation closes at the first later return message travelling the
/// opposite way (receiver back to sender); without one it stays open
/// until the last message. `depth` is the count of activations on the
/// same lifeline still open at the start index, so nested self-calls
/// stack while completed ones do not inflate later depths.
pub fn get_lifeline_activations(
    participants: &[String],
    messages: &[Message],
) -> IndexMap<String, Vec<Activation>> {
    let mut open: IndexMap<String, Vec<(usize, Option<usize>)>> = participants
        .iter()
        .map(|p| (p.clone(), Vec::new()))
        .collect();

    for (i, msg) in messages.iter().enumerate() {
        if msg.is_return {
            continue;
        }

        let end_index = messages[i + 1..]
            .iter()
            .position(|next| next.is_return && next.from == msg.to && next.to == msg.from)
            .map(|offset| i + 1 + offset);

        open.entry(msg.to.clone()).or_default().push((i, end_index));
    }

    let last = messages.len().saturating_sub(1);
    let mut activations: IndexMap<String, Vec<Activation>> = IndexMap::new();
    for (participant, stack) in open {
        let mut resolved = Vec::with_capacity(stack.len());
        for (idx, (start, end)) in stack.iter().enumerate() {
            let depth = stack[..idx]
                .iter()
                .filter(|(_, e)| e.map_or(true, |e| e >= *start))
                .count();
            resolved.push(Activation {
                start_index: *start,
                end_index: end.unwrap_or(last),
                depth,
            });
        }
        activations.insert(participant, resolved);
    }

    activations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(from: &str, to: &str, method: &str) -> Message {
        Message {
            from: from.to_string(),
            to: to.to_string(),
            method: method.to_string(),
            ..Message::default()
        }
    }

    fn ret(from: &str, to: &str, method: &str) -> Message {
        Message {
            is_return: true,
            ..call(from, to, method)
        }
    }

    #[test]
    fn activation_closes_at_matching_return() {
        let participants = vec!["a".to_string(), "b".to_string()];
        let messages = vec![
            call("a", "b", "work"),
            ret("b", "a", "return from work"),
        ];
        let activations = get_lifeline_activations(&participants, &messages);
        assert_eq!(
            activations["b"],
            vec![Activation { start_index: 0, end_index: 1, depth: 0 }]
        );
        assert!(activations["a"].is_empty());
    }

    #[test]
    fn unclosed_activation_runs_to_the_last_message() {
        let participants = vec!["a".to_string()];
        let messages = vec![call("a", "a", "first"), call("a", "a", "second")];
        let activations = get_lifeline_activations(&participants, &messages);
        assert_eq!(activations["a"].len(), 2);
        assert_eq!(activations["a"][0].end_index, 1);
        assert_eq!(activations["a"][1].end_index, 1);
    }

    #[test]
    fn depth_counts_only_activations_still_open() {
        let participants = vec!["a".to_string()];
        let messages = vec![
            call("a", "a", "first"),
            ret("a", "a", "return from first"),
            call("a", "a", "second"),
        ];
        let activations = get_lifeline_activations(&participants, &messages);
        // "first" closed at index 1, so "second" starts at depth 0 again
        assert_eq!(activations["a"][1].depth, 0);
    }
}
