use indexmap::IndexMap;
use tracing::debug;

use crate::diagram::{AsyncDiagram, Message};
use crate::models::{lineno_lookup, AsyncPattern};
use crate::sequence::{extract_participants_from_sequence, SequenceItem};

/// How a call executes relative to the track that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutionContext {
    /// async function or method body
    Async,
    /// promise chain step
    Promise,
    /// spawned thread or task
    Parallel,
    /// callback-style continuation
    Callback,
}

struct AsyncItem<'a> {
    item: &'a SequenceItem,
    context: Option<ExecutionContext>,
    thread_name: Option<&'a str>,
    is_async: bool,
    is_awaited: bool,
    suspend_point: bool,
}

/// Builds a sequence diagram annotated with parallel execution tracks.
///
/// Async patterns are matched to sequence items by line number (the last
/// pattern on a line wins). Calls classified as async, promise, parallel
/// or callback open a new named track; execution switches to it for the
/// following messages. An await expression is a suspend point: the most
/// recent non-main track is popped and execution resumes on the track
/// beneath it. `execution_tracks` records which messages ran on which
/// track, in message order.
pub fn generate_async_enhanced_diagram(
    sequence: &[SequenceItem],
    async_patterns: &[AsyncPattern],
    include_returns: bool,
    title: Option<&str>,
) -> AsyncDiagram {
    let participants = extract_participants_from_sequence(sequence);
    let lookup = lineno_lookup(async_patterns, AsyncPattern::lineno);

    let enriched: Vec<AsyncItem<'_>> = sequence
        .iter()
        .map(|item| enrich_item(item, lookup.get(&item.lineno).copied()))
        .collect();

    let (messages, execution_tracks) =
        generate_messages_with_tracks(&enriched, &participants, include_returns);

    debug!(
        tracks = execution_tracks.len(),
        messages = messages.len(),
        "generated async-enhanced diagram"
    );

    AsyncDiagram {
        participants,
        messages,
        execution_tracks,
        title: title.map(str::to_owned),
    }
}

fn enrich_item<'a>(item: &'a SequenceItem, pattern: Option<&'a AsyncPattern>) -> AsyncItem<'a> {
    let mut enriched = AsyncItem {
        item,
        context: None,
        thread_name: None,
        is_async: item.is_async,
        is_awaited: false,
        suspend_point: false,
    };

    match pattern {
        Some(AsyncPattern::AsyncFunction { .. } | AsyncPattern::AsyncMethod { .. }) => {
            enriched.context = Some(ExecutionContext::Async);
            enriched.is_async = true;
        }
        Some(AsyncPattern::PromiseThen { .. } | AsyncPattern::PromiseCatch { .. }) => {
            enriched.context = Some(ExecutionContext::Promise);
            enriched.is_async = true;
        }
        Some(AsyncPattern::Threading { target, .. }) => {
            enriched.context = Some(ExecutionContext::Parallel);
            enriched.thread_name = Some(target.as_str());
            enriched.is_async = true;
        }
        Some(AsyncPattern::CreateTask { .. }) => {
            enriched.context = Some(ExecutionContext::Parallel);
            enriched.is_async = true;
        }
        Some(AsyncPattern::AwaitExpression { .. }) => {
            enriched.is_awaited = true;
            enriched.suspend_point = true;
        }
        Some(AsyncPattern::CallbackPattern { .. }) => {
            enriched.context = Some(ExecutionContext::Callback);
            enriched.is_async = true;
        }
        // Gather and run markers describe synchronization, not a call
        // context switch
        Some(AsyncPattern::AsyncioGather { .. } | AsyncPattern::AsyncioRun { .. }) | None => {}
    }

    enriched
}

fn generate_messages_with_tracks(
    enriched: &[AsyncItem<'_>],
    participants: &[String],
    include_returns: bool,
) -> (Vec<Message>, IndexMap<String, Vec<usize>>) {
    let mut messages: Vec<Message> = Vec::with_capacity(enriched.len());
    let mut execution_tracks: IndexMap<String, Vec<usize>> =
        IndexMap::from([("main".to_string(), Vec::new())]);
    let mut current_track = "main".to_string();
    let mut track_stack = vec!["main".to_string()];

    for entry in enriched {
        let item = entry.item;
        let from = item.base_object();

        // Async messages render on the caller's own lifeline
        let caller_parts: Vec<&str> = item.caller.split('.').collect();
        let to = match caller_parts.first() {
            Some(base) if caller_parts.len() > 1 && participants.iter().any(|p| p == base) => {
                (*base).to_owned()
            }
            _ => from.clone(),
        };

        let mut message = Message {
            from,
            to,
            method: item.method.clone(),
            args: item.args.clone(),
            lineno: item.lineno,
            depth: Some(item.depth),
            track: Some(current_track.clone()),
            is_async: entry.is_async,
            is_conditional: item.is_conditional,
            condition: item.is_conditional.then(|| item.condition.clone()),
            is_cycle_ref: item.is_cycle_ref,
            is_awaited: entry.is_awaited,
            suspend_point: entry.suspend_point,
            ..Message::default()
        };

        if entry.is_async {
            if let Some(context) = entry.context {
                let new_track = match context {
                    ExecutionContext::Parallel => entry
                        .thread_name
                        .map(str::to_owned)
                        .unwrap_or_else(|| format!("thread_{}", execution_tracks.len())),
                    ExecutionContext::Async => format!("async_{}", execution_tracks.len()),
                    ExecutionContext::Promise => format!("promise_{}", execution_tracks.len()),
                    ExecutionContext::Callback => format!("callback_{}", execution_tracks.len()),
                };
                execution_tracks.entry(new_track.clone()).or_default();
                track_stack.push(new_track.clone());
                message.creates_track = Some(new_track);
            }
        }

        if entry.suspend_point && track_stack.len() > 1 {
            track_stack.pop();
            current_track = track_stack
                .last()
                .cloned()
                .unwrap_or_else(|| "main".to_string());
            message.returns_to_track = Some(current_track.clone());
        }

        let created = message.creates_track.clone();
        messages.push(message);
        let index = messages.len() - 1;
        execution_tracks
            .entry(current_track.clone())
            .or_default()
            .push(index);

        if let Some(new_track) = created {
            current_track = new_track;
        }
    }

    if include_returns {
        for ret in generate_async_return_messages(&messages) {
            let track = ret.track.clone().unwrap_or_else(|| "main".to_string());
            messages.push(ret);
            let index = messages.len() - 1;
            if let Some(indices) = execution_tracks.get_mut(&track) {
                indices.push(index);
            }
        }
    }

    (messages, execution_tracks)
}

/// Returns for every call except suspend points, which hand control back
/// themselves. Track-spawning calls complete on the main track.
fn generate_async_return_messages(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .filter(|msg| !msg.suspend_point)
        .map(|msg| Message {
            from: msg.to.clone(),
            to: msg.from.clone(),
            method: format!("return from {}", msg.method),
            lineno: msg.lineno,
            track: msg.track.clone(),
            is_return: true,
            is_async: msg.is_async,
            is_conditional: msg.is_conditional,
            condition: msg.condition.clone(),
            returns_to_track: msg
                .creates_track
                .is_some()
                .then(|| "main".to_string()),
            ..Message::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(caller: &str, method: &str, lineno: u32, depth: u32) -> SequenceItem {
        let mut item = SequenceItem::new(caller, method, Vec::new(), lineno);
        item.depth = depth;
        item
    }

    #[test]
    fn threading_pattern_opens_a_named_track() {
        let sequence = vec![
            item("app", "start", 1, 0),
            item("app", "spawn_worker", 2, 1),
            item("app", "collect", 3, 1),
        ];
        let patterns = vec![AsyncPattern::Threading {
            target: "worker".to_string(),
            lineno: 2,
        }];
        let diagram = generate_async_enhanced_diagram(&sequence, &patterns, false, None);

        assert_eq!(
            diagram.messages[1].creates_track.as_deref(),
            Some("worker")
        );
        assert!(diagram.messages[1].is_async);
        // The spawning message itself still belongs to main; the next
        // message runs on the new track.
        assert_eq!(diagram.messages[1].track.as_deref(), Some("main"));
        assert_eq!(diagram.execution_tracks["worker"], vec![2]);
        assert_eq!(diagram.execution_tracks["main"], vec![0, 1]);
    }

    #[test]
    fn await_pops_back_to_the_previous_track() {
        let sequence = vec![
            item("app", "fetch", 1, 0),
            item("app", "parse", 2, 1),
            item("app", "await_result", 3, 1),
            item("app", "done", 4, 0),
        ];
        let patterns = vec![
            AsyncPattern::AsyncFunction {
                name: "fetch".to_string(),
                lineno: 1,
            },
            AsyncPattern::AwaitExpression {
                function: None,
                lineno: 3,
            },
        ];
        let diagram = generate_async_enhanced_diagram(&sequence, &patterns, false, None);

        assert_eq!(diagram.messages[0].creates_track.as_deref(), Some("async_1"));
        assert_eq!(diagram.messages[1].track.as_deref(), Some("async_1"));
        assert!(diagram.messages[2].suspend_point);
        assert_eq!(diagram.messages[2].returns_to_track.as_deref(), Some("main"));
        assert_eq!(diagram.messages[3].track.as_deref(), Some("main"));
    }

    #[test]
    fn returns_skip_suspend_points_and_close_on_main() {
        let sequence = vec![item("app", "fetch", 1, 0), item("app", "await_it", 2, 1)];
        let patterns = vec![
            AsyncPattern::AsyncFunction {
                name: "fetch".to_string(),
                lineno: 1,
            },
            AsyncPattern::AwaitExpression {
                function: None,
                lineno: 2,
            },
        ];
        let diagram = generate_async_enhanced_diagram(&sequence, &patterns, true, None);

        let returns: Vec<&Message> = diagram.messages.iter().filter(|m| m.is_return).collect();
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].method, "return from fetch");
        assert_eq!(returns[0].returns_to_track.as_deref(), Some("main"));
    }

    #[test]
    fn last_pattern_on_a_line_wins() {
        let sequence = vec![item("app", "go", 5, 0)];
        let patterns = vec![
            AsyncPattern::Threading {
                target: "worker".to_string(),
                lineno: 5,
            },
            AsyncPattern::PromiseThen {
                caller: "app".to_string(),
                lineno: 5,
            },
        ];
        let diagram = generate_async_enhanced_diagram(&sequence, &patterns, false, None);
        assert_eq!(
            diagram.messages[0].creates_track.as_deref(),
            Some("promise_1")
        );
    }
}
