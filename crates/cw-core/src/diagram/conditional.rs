use tracing::debug;

use crate::diagram::{ConditionKind, ConditionalBlock, ConditionalDiagram, LoopControl, Message};
use crate::models::{lineno_lookup, ConditionalPattern};
use crate::sequence::{extract_participants_from_sequence, SequenceItem};

struct ConditionalItem<'a> {
    item: &'a SequenceItem,
    is_conditional: bool,
    condition: String,
    kind: ConditionKind,
    has_else: bool,
    nesting_level: u32,
    is_loop: bool,
    loop_control: Option<LoopControl>,
    in_conditional_block: bool,
    parent_condition: Option<String>,
    parent_nesting_level: u32,
}

struct ConditionRegion {
    start_idx: usize,
    end_idx: Option<usize>,
    condition: String,
    kind: ConditionKind,
    has_else: bool,
    nesting_level: u32,
    is_loop: bool,
}

/// Builds a sequence diagram annotated with conditional regions.
///
/// Conditional patterns are matched to sequence items by line number
/// (the last pattern on a line wins). A matched item opens a region;
/// following items stay inside it while their structural depth is at
/// least the region's nesting level, and the region closes on the first
/// item below that level, at a sibling conditional of the same level, or
/// at the end of the sequence. Regions are reported as blocks spanning
/// their first and last message id.
pub fn generate_conditional_enhanced_diagram(
    sequence: &[SequenceItem],
    conditional_patterns: &[ConditionalPattern],
    include_returns: bool,
    title: Option<&str>,
) -> ConditionalDiagram {
    let participants = extract_participants_from_sequence(sequence);
    let lookup = lineno_lookup(conditional_patterns, ConditionalPattern::lineno);

    let enriched = enrich_sequence(sequence, |lineno| lookup.get(&lineno).copied());

    let (messages, conditional_blocks) =
        generate_messages_with_blocks(&enriched, &participants, include_returns);

    debug!(
        blocks = conditional_blocks.len(),
        messages = messages.len(),
        "generated conditional-enhanced diagram"
    );

    ConditionalDiagram {
        participants,
        messages,
        conditional_blocks,
        title: title.map(str::to_owned),
    }
}

fn enrich_sequence<'a>(
    sequence: &'a [SequenceItem],
    pattern_at: impl Fn(u32) -> Option<&'a ConditionalPattern>,
) -> Vec<ConditionalItem<'a>> {
    let mut enriched = Vec::with_capacity(sequence.len());

    // If statements span multiple sequence items; track the one currently
    // in scope so its body can be tagged.
    let mut current_if: Option<(String, u32)> = None;

    for item in sequence {
        let mut entry = ConditionalItem {
            item,
            is_conditional: item.is_conditional,
            condition: item.condition.clone(),
            kind: ConditionKind::IfStatement,
            has_else: false,
            nesting_level: 0,
            is_loop: false,
            loop_control: None,
            in_conditional_block: false,
            parent_condition: None,
            parent_nesting_level: 0,
        };

        match pattern_at(item.lineno) {
            Some(ConditionalPattern::IfStatement {
                condition,
                has_else,
                nesting_level,
                ..
            }) => {
                entry.is_conditional = true;
                entry.condition = condition.clone();
                entry.kind = ConditionKind::IfStatement;
                entry.has_else = *has_else;
                entry.nesting_level = *nesting_level;
                current_if = Some((condition.clone(), *nesting_level));
            }
            Some(ConditionalPattern::IfElifChain {
                condition,
                has_else,
                nesting_level,
                ..
            }) => {
                entry.is_conditional = true;
                entry.condition = condition.clone();
                entry.kind = ConditionKind::IfElifChain;
                entry.has_else = *has_else;
                entry.nesting_level = *nesting_level;
                current_if = Some((condition.clone(), *nesting_level));
            }
            Some(ConditionalPattern::Ternary { condition, .. }) => {
                entry.is_conditional = true;
                entry.condition = condition.clone();
                entry.kind = ConditionKind::Ternary;
                // A ternary always carries an else arm
                entry.has_else = true;
            }
            Some(ConditionalPattern::SwitchCase {
                switch_expression,
                has_default,
                ..
            }) => {
                entry.is_conditional = true;
                entry.condition = format!("switch({switch_expression})");
                entry.kind = ConditionKind::SwitchCase;
                entry.has_else = *has_default;
            }
            Some(ConditionalPattern::TryExcept { .. }) => {
                entry.is_conditional = true;
                entry.condition = "try".to_string();
                entry.kind = ConditionKind::TryExcept;
            }
            Some(ConditionalPattern::TryCatch { .. }) => {
                entry.is_conditional = true;
                entry.condition = "try".to_string();
                entry.kind = ConditionKind::TryCatch;
            }
            Some(ConditionalPattern::ForLoop {
                target, iterable, ..
            }) => {
                entry.is_conditional = true;
                entry.condition = format!("for {target} in {iterable}");
                entry.kind = ConditionKind::ForLoop;
                entry.is_loop = true;
            }
            Some(ConditionalPattern::WhileLoop { condition, .. }) => {
                entry.is_conditional = true;
                entry.condition = condition.clone();
                entry.kind = ConditionKind::WhileLoop;
                entry.is_loop = true;
            }
            Some(ConditionalPattern::IfBreak { condition, .. }) => {
                entry.is_conditional = true;
                entry.condition = condition.clone();
                entry.kind = ConditionKind::IfBreak;
                entry.loop_control = Some(LoopControl::Break);
            }
            Some(ConditionalPattern::IfContinue { condition, .. }) => {
                entry.is_conditional = true;
                entry.condition = condition.clone();
                entry.kind = ConditionKind::IfContinue;
                entry.loop_control = Some(LoopControl::Continue);
            }
            None => {
                if let Some((condition, nesting)) = &current_if {
                    if item.depth >= *nesting {
                        entry.in_conditional_block = true;
                        entry.parent_condition = Some(condition.clone());
                        entry.parent_nesting_level = *nesting;
                    } else {
                        current_if = None;
                    }
                }
            }
        }

        enriched.push(entry);
    }

    enriched
}

fn generate_messages_with_blocks(
    enriched: &[ConditionalItem<'_>],
    participants: &[String],
    include_returns: bool,
) -> (Vec<Message>, Vec<ConditionalBlock>) {
    let mut messages: Vec<Message> = Vec::with_capacity(enriched.len());
    let mut regions: Vec<ConditionRegion> = Vec::new();
    // Indices into `regions` for blocks still open
    let mut open: Vec<usize> = Vec::new();

    for (idx, entry) in enriched.iter().enumerate() {
        let item = entry.item;

        // Close regions the current item has stepped out of
        while let Some(&top) = open.last() {
            let top_nesting = regions[top].nesting_level;
            let exited = if entry.is_conditional {
                // A sibling conditional at the same or shallower level
                // ends the previous region
                entry.nesting_level <= top_nesting
            } else if entry.in_conditional_block {
                entry.parent_nesting_level < top_nesting
            } else {
                true
            };
            if exited && idx > 0 {
                regions[top].end_idx = Some(idx - 1);
                open.pop();
            } else {
                break;
            }
        }

        let from = item.base_object();
        // Conditional messages render on the caller's own lifeline
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
            id: Some(format!("message_{idx}")),
            is_cycle_ref: item.is_cycle_ref,
            loop_control: entry.loop_control,
            ..Message::default()
        };

        if entry.is_conditional {
            message.is_conditional = true;
            message.condition = Some(entry.condition.clone());
            message.condition_type = Some(entry.kind);

            open.push(regions.len());
            regions.push(ConditionRegion {
                start_idx: idx,
                end_idx: None,
                condition: entry.condition.clone(),
                kind: entry.kind,
                has_else: entry.has_else,
                nesting_level: entry.nesting_level,
                is_loop: entry.is_loop,
            });
        }

        if entry.in_conditional_block {
            message.in_conditional_block = true;
            message.parent_condition = entry.parent_condition.clone();
        }

        messages.push(message);
    }

    let blocks = format_blocks(&regions, &messages);

    if include_returns {
        let returns = generate_conditional_return_messages(&messages, &regions);
        messages.extend(returns);
    }

    (messages, blocks)
}

fn format_blocks(regions: &[ConditionRegion], messages: &[Message]) -> Vec<ConditionalBlock> {
    let last = messages.len().saturating_sub(1);
    regions
        .iter()
        .map(|region| {
            let end_idx = region.end_idx.unwrap_or(last).max(region.start_idx);
            ConditionalBlock {
                start_message_id: messages[region.start_idx]
                    .id
                    .clone()
                    .unwrap_or_default(),
                end_message_id: messages[end_idx].id.clone().unwrap_or_default(),
                condition: region.condition.clone(),
                kind: region.kind,
                has_else: region.has_else,
                nesting_level: region.nesting_level,
                is_loop: region.is_loop,
            }
        })
        .collect()
}

/// Returns for every call; a return keeps the conditional context of the
/// call it answers, falling back to the innermost region spanning it
fn generate_conditional_return_messages(
    messages: &[Message],
    regions: &[ConditionRegion],
) -> Vec<Message> {
    let last = messages.len().saturating_sub(1);
    messages
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let mut ret = Message {
                from: msg.to.clone(),
                to: msg.from.clone(),
                method: format!("return from {}", msg.method),
                lineno: msg.lineno,
                id: msg.id.as_ref().map(|id| format!("return_{id}")),
                is_return: true,
                is_conditional: msg.is_conditional,
                condition: msg.condition.clone(),
                condition_type: msg.condition_type,
                in_conditional_block: msg.in_conditional_block,
                parent_condition: msg.parent_condition.clone(),
                ..Message::default()
            };

            if !ret.in_conditional_block {
                let innermost = regions
                    .iter()
                    .filter(|region| {
                        let end = region.end_idx.unwrap_or(last).max(region.start_idx);
                        region.start_idx <= i && i <= end
                    })
                    .max_by_key(|region| region.nesting_level);
                if let Some(region) = innermost {
                    ret.in_conditional_block = true;
                    ret.parent_condition = Some(region.condition.clone());
                }
            }

            ret
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
    fn if_region_spans_its_body_and_closes_on_depth_drop() {
        let sequence = vec![
            item("app", "main", 1, 0),
            item("app", "check", 2, 1),
            item("app", "handle", 3, 1),
            item("app", "done", 4, 0),
        ];
        let patterns = vec![ConditionalPattern::IfStatement {
            condition: "x > 0".to_string(),
            has_else: false,
            nesting_level: 1,
            lineno: 2,
        }];
        let diagram = generate_conditional_enhanced_diagram(&sequence, &patterns, false, None);

        assert_eq!(diagram.conditional_blocks.len(), 1);
        let block = &diagram.conditional_blocks[0];
        assert_eq!(block.start_message_id, "message_1");
        assert_eq!(block.end_message_id, "message_2");
        assert_eq!(block.condition, "x > 0");
        assert_eq!(block.kind, ConditionKind::IfStatement);

        assert!(diagram.messages[1].is_conditional);
        assert!(diagram.messages[2].in_conditional_block);
        assert_eq!(
            diagram.messages[2].parent_condition.as_deref(),
            Some("x > 0")
        );
        assert!(!diagram.messages[3].in_conditional_block);
    }

    #[test]
    fn sibling_conditional_closes_the_previous_region() {
        let sequence = vec![
            item("app", "first", 1, 1),
            item("app", "body", 2, 1),
            item("app", "second", 3, 1),
        ];
        let patterns = vec![
            ConditionalPattern::IfStatement {
                condition: "a".to_string(),
                has_else: false,
                nesting_level: 1,
                lineno: 1,
            },
            ConditionalPattern::IfStatement {
                condition: "b".to_string(),
                has_else: true,
                nesting_level: 1,
                lineno: 3,
            },
        ];
        let diagram = generate_conditional_enhanced_diagram(&sequence, &patterns, false, None);

        assert_eq!(diagram.conditional_blocks.len(), 2);
        assert_eq!(diagram.conditional_blocks[0].end_message_id, "message_1");
        assert_eq!(diagram.conditional_blocks[1].start_message_id, "message_2");
        assert_eq!(diagram.conditional_blocks[1].end_message_id, "message_2");
        assert!(diagram.conditional_blocks[1].has_else);
    }

    #[test]
    fn loops_and_switches_format_their_conditions() {
        let sequence = vec![item("app", "iterate", 1, 0), item("app", "pick", 2, 0)];
        let patterns = vec![
            ConditionalPattern::ForLoop {
                target: "row".to_string(),
                iterable: "rows".to_string(),
                has_else: false,
                lineno: 1,
            },
            ConditionalPattern::SwitchCase {
                switch_expression: "kind".to_string(),
                has_default: true,
                cases: 3,
                lineno: 2,
            },
        ];
        let diagram = generate_conditional_enhanced_diagram(&sequence, &patterns, false, None);

        assert_eq!(
            diagram.messages[0].condition.as_deref(),
            Some("for row in rows")
        );
        assert!(diagram.conditional_blocks[0].is_loop);
        assert_eq!(
            diagram.messages[1].condition.as_deref(),
            Some("switch(kind)")
        );
        assert!(diagram.conditional_blocks[1].has_else);
    }

    #[test]
    fn break_guard_carries_loop_control() {
        let sequence = vec![item("app", "scan", 5, 1)];
        let patterns = vec![ConditionalPattern::IfBreak {
            condition: "found".to_string(),
            lineno: 5,
        }];
        let diagram = generate_conditional_enhanced_diagram(&sequence, &patterns, false, None);
        assert_eq!(diagram.messages[0].loop_control, Some(LoopControl::Break));
        assert_eq!(
            diagram.messages[0].condition_type,
            Some(ConditionKind::IfBreak)
        );
    }

    #[test]
    fn returns_fall_back_to_the_innermost_spanning_region() {
        let sequence = vec![
            item("app", "check", 1, 0),
            item("app", "other", 2, 2),
        ];
        let patterns = vec![ConditionalPattern::WhileLoop {
            condition: "pending".to_string(),
            has_else: false,
            lineno: 1,
        }];
        let diagram = generate_conditional_enhanced_diagram(&sequence, &patterns, true, None);

        let ret: Vec<&Message> = diagram.messages.iter().filter(|m| m.is_return).collect();
        assert_eq!(ret.len(), 2);
        assert_eq!(ret[0].id.as_deref(), Some("return_message_0"));
        assert!(ret[0].is_conditional);
        // The opener sits inside its own region, so its return picks up
        // that region's condition.
        assert!(ret[0].in_conditional_block);
        assert_eq!(ret[0].parent_condition.as_deref(), Some("pending"));
        // The second call left the region before it ran.
        assert!(!ret[1].in_conditional_block);
    }
}
