use std::collections::HashMap;

use tracing::debug;

use crate::diagram::{Message, SequenceDiagram};
use crate::sequence::{extract_participants_from_sequence, SequenceItem};

/// Builds the base sequence diagram from an ordered call sequence.
///
/// Participants come from `extract_participants_from_sequence`. Every
/// item becomes one message; a call whose caller chain names another
/// participant as its second segment is drawn to that participant,
/// otherwise to the caller's own lifeline. With `include_returns` a
/// mirrored `return from {method}` message is appended for every call,
/// in call order, after all call messages.
pub fn generate_sequence_diagram_data(
    sequence: &[SequenceItem],
    include_returns: bool,
    title: Option<&str>,
) -> SequenceDiagram {
    let participants = extract_participants_from_sequence(sequence);

    let mut messages: Vec<Message> = Vec::with_capacity(sequence.len());
    for item in sequence {
        messages.push(base_message(item, &participants));
    }

    if include_returns {
        let returns = generate_return_messages(&messages);
        messages.extend(returns);
    }

    debug!(
        participants = participants.len(),
        messages = messages.len(),
        "generated sequence diagram data"
    );

    SequenceDiagram {
        participants,
        messages,
        title: title.map(str::to_owned),
    }
}

fn base_message(item: &SequenceItem, participants: &[String]) -> Message {
    let from = item.base_object();

    // Calls stay on the caller's own lifeline unless the second segment
    // of the caller chain names another participant.
    let caller_parts: Vec<&str> = item.caller.split('.').collect();
    let to = match caller_parts.get(1) {
        Some(segment) if participants.iter().any(|p| p == segment) => (*segment).to_owned(),
        _ => from.clone(),
    };

    Message {
        from,
        to,
        method: item.method.clone(),
        args: item.args.clone(),
        lineno: item.lineno,
        depth: Some(item.depth),
        is_async: item.is_async,
        is_conditional: item.is_conditional,
        condition: item
            .is_conditional
            .then(|| item.condition.clone()),
        is_cycle_ref: item.is_cycle_ref,
        ..Message::default()
    }
}

/// One mirrored return message per call, preserving depth and the async
/// and conditional flags of the call it answers
pub(crate) fn generate_return_messages(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .map(|msg| Message {
            from: msg.to.clone(),
            to: msg.from.clone(),
            method: format!("return from {}", msg.method),
            lineno: msg.lineno,
            depth: msg.depth,
            is_return: true,
            is_async: msg.is_async,
            is_conditional: msg.is_conditional,
            condition: msg.condition.clone(),
            ..Message::default()
        })
        .collect()
}

/// Attaches source snippets to messages whose line number has one
pub fn enrich_diagram_with_code_snippets(
    mut diagram: SequenceDiagram,
    code_snippets: &HashMap<u32, String>,
) -> SequenceDiagram {
    for msg in &mut diagram.messages {
        if let Some(snippet) = code_snippets.get(&msg.lineno) {
            msg.code_snippet = Some(snippet.clone());
        }
    }
    diagram
}
