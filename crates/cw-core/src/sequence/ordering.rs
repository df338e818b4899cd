use std::collections::HashSet;

use crate::call_graph::CallGraphNode;
use crate::models::CreationRecord;
use crate::sequence::SequenceItem;

/// Flattens a call forest into one execution-linear sequence.
///
/// Depth-first pre-order: roots sorted by line number, children visited in
/// line order at `depth + 1`. Cycle-reference nodes are emitted as
/// terminal items and never expanded. A visited set additionally skips any
/// node id that was already emitted, so traversal terminates even if the
/// builder ever let a cycle through.
pub fn order_sequence_from_call_graph(root_nodes: &[CallGraphNode]) -> Vec<SequenceItem> {
    let mut sequence = Vec::new();
    let mut processed: HashSet<String> = HashSet::new();

    let mut sorted_roots: Vec<&CallGraphNode> = root_nodes.iter().collect();
    sorted_roots.sort_by_key(|node| node.lineno);

    for root in sorted_roots {
        visit(root, 0, &mut sequence, &mut processed);
    }

    sequence
}

fn visit(
    node: &CallGraphNode,
    depth: u32,
    sequence: &mut Vec<SequenceItem>,
    processed: &mut HashSet<String>,
) {
    let node_id = node.node_id();
    if processed.contains(&node_id) && !node.is_cycle_ref {
        return;
    }
    processed.insert(node_id);

    let mut item = SequenceItem::new(
        node.caller.clone(),
        node.method.clone(),
        node.args.clone(),
        node.lineno,
    );
    item.depth = depth;
    item.is_cycle_ref = node.is_cycle_ref;
    item.is_async = node.is_async;
    item.is_conditional = node.is_conditional;
    item.condition = node.condition.clone();
    item.is_object_creation = node.is_object_creation;
    item.target_object = node.target_object.clone();
    sequence.push(item);

    // Cycle references are terminal markers
    if node.is_cycle_ref {
        return;
    }

    let mut children: Vec<&CallGraphNode> = node.children.iter().collect();
    children.sort_by_key(|child| child.lineno);
    for child in children {
        visit(child, depth + 1, sequence, processed);
    }
}

/// Splices creation items into an ordered sequence by line number.
///
/// Only creations whose target is actually referenced by some item's
/// caller are added, and creations already present in the sequence are
/// not duplicated. Creations before the first item are prepended; the
/// rest are inserted before the first item with a greater line number, so
/// at equal line numbers calls come first.
pub fn enhance_sequence_with_object_creations(
    sequence: Vec<SequenceItem>,
    object_creations: &[CreationRecord],
) -> Vec<SequenceItem> {
    let used_objects: HashSet<String> = sequence.iter().map(SequenceItem::base_object).collect();
    let existing_targets: HashSet<&str> = sequence
        .iter()
        .filter(|item| item.is_object_creation)
        .filter_map(|item| item.target_object.as_deref())
        .collect();

    let mut creation_items: Vec<SequenceItem> = Vec::new();
    for creation in object_creations {
        let Some(target) = &creation.target else {
            continue;
        };
        if !used_objects.contains(target) || existing_targets.contains(target.as_str()) {
            continue;
        }
        let mut item = SequenceItem::new(
            "Constructor",
            creation.class_name.clone(),
            creation.args.clone(),
            creation.lineno,
        );
        item.is_object_creation = true;
        item.target_object = Some(target.clone());
        creation_items.push(item);
    }

    if creation_items.is_empty() {
        return sequence;
    }
    creation_items.sort_by_key(|item| item.lineno);

    let mut result = Vec::with_capacity(sequence.len() + creation_items.len());
    let mut creations = creation_items.into_iter().peekable();

    for item in sequence {
        while creations
            .peek()
            .is_some_and(|creation| creation.lineno < item.lineno)
        {
            result.push(creations.next().unwrap());
        }
        result.push(item);
    }
    result.extend(creations);

    result
}

/// Ordered set of participant names for diagram lifelines.
///
/// Creation targets come first in appearance order, then caller-derived
/// base objects; each name appears once, first occurrence winning.
pub fn extract_participants_from_sequence(sequence: &[SequenceItem]) -> Vec<String> {
    let mut participants = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for item in sequence {
        if item.is_object_creation {
            if let Some(target) = &item.target_object {
                if seen.insert(target.clone()) {
                    participants.push(target.clone());
                }
            }
        }
    }

    for item in sequence {
        if !item.is_object_creation {
            let object = item.base_object();
            if seen.insert(object.clone()) {
                participants.push(object);
            }
        }
    }

    participants
}

/// Marks runs of consecutive items that share the same condition as a
/// conditional block
pub fn detect_conditional_blocks(mut sequence: Vec<SequenceItem>) -> Vec<SequenceItem> {
    let mut i = 0;
    while i < sequence.len() {
        if !sequence[i].is_conditional {
            i += 1;
            continue;
        }
        let condition = sequence[i].condition.clone();
        let start = i;
        let mut end = i;
        let mut j = i + 1;
        while j < sequence.len()
            && sequence[j].is_conditional
            && sequence[j].condition == condition
        {
            end = j;
            j += 1;
        }
        if end > start {
            sequence[start].is_conditional_block_start = true;
            sequence[end].is_conditional_block_end = true;
        }
        i = end + 1;
    }
    sequence
}

/// Marks runs of consecutive async items initiated by the same caller as
/// an async block
pub fn detect_async_blocks(mut sequence: Vec<SequenceItem>) -> Vec<SequenceItem> {
    let mut i = 0;
    while i < sequence.len() {
        if !sequence[i].is_async {
            i += 1;
            continue;
        }
        let caller = sequence[i].caller.clone();
        let start = i;
        let mut end = i;
        let mut j = i + 1;
        while j < sequence.len() && sequence[j].is_async && sequence[j].caller == caller {
            end = j;
            j += 1;
        }
        if end > start {
            sequence[start].is_async_block_start = true;
            sequence[end].is_async_block_end = true;
        }
        i = end + 1;
    }
    sequence
}

/// Applies the render-oriented sequence passes: block detection plus
/// display id assignment
pub fn optimize_sequence_for_diagram(sequence: Vec<SequenceItem>) -> Vec<SequenceItem> {
    let sequence = detect_conditional_blocks(sequence);
    let mut sequence = detect_async_blocks(sequence);

    for (i, item) in sequence.iter_mut().enumerate() {
        item.display_id = Some(i);
    }

    sequence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(caller: &str, method: &str, lineno: u32) -> SequenceItem {
        SequenceItem::new(caller, method, Vec::new(), lineno)
    }

    fn async_item(caller: &str, method: &str, lineno: u32) -> SequenceItem {
        let mut item = item(caller, method, lineno);
        item.is_async = true;
        item
    }

    fn conditional_item(caller: &str, method: &str, lineno: u32, condition: &str) -> SequenceItem {
        let mut item = item(caller, method, lineno);
        item.is_conditional = true;
        item.condition = condition.to_string();
        item
    }

    #[test]
    fn async_run_is_marked_at_its_first_and_last_item() {
        let sequence = vec![
            async_item("app", "fetch", 1),
            async_item("app", "parse", 2),
            item("app", "render", 3),
        ];

        let sequence = detect_async_blocks(sequence);

        assert!(sequence[0].is_async_block_start);
        assert!(!sequence[0].is_async_block_end);
        assert!(sequence[1].is_async_block_end);
        assert!(!sequence[1].is_async_block_start);
        assert!(!sequence[2].is_async_block_start && !sequence[2].is_async_block_end);
    }

    #[test]
    fn lone_async_item_gets_no_block_markers() {
        let sequence = detect_async_blocks(vec![
            item("app", "boot", 1),
            async_item("app", "fetch", 2),
            item("app", "render", 3),
        ]);

        assert!(!sequence[1].is_async_block_start);
        assert!(!sequence[1].is_async_block_end);
    }

    #[test]
    fn caller_change_splits_async_runs() {
        let sequence = detect_async_blocks(vec![
            async_item("app", "fetch", 1),
            async_item("app", "parse", 2),
            async_item("worker", "crunch", 3),
        ]);

        // The run ends where the caller changes; the lone tail item is
        // not a block of its own.
        assert!(sequence[0].is_async_block_start);
        assert!(sequence[1].is_async_block_end);
        assert!(!sequence[2].is_async_block_start);
        assert!(!sequence[2].is_async_block_end);
    }

    #[test]
    fn conditional_run_is_marked_per_shared_condition() {
        let sequence = detect_conditional_blocks(vec![
            conditional_item("app", "validate", 1, "x > 0"),
            conditional_item("app", "store", 2, "x > 0"),
            conditional_item("app", "report", 3, "x < 0"),
        ]);

        assert!(sequence[0].is_conditional_block_start);
        assert!(sequence[1].is_conditional_block_end);
        // The condition changed, so the last item starts no new block by
        // itself.
        assert!(!sequence[2].is_conditional_block_start);
        assert!(!sequence[2].is_conditional_block_end);
    }

    #[test]
    fn optimize_marks_blocks_and_assigns_display_ids() {
        let sequence = optimize_sequence_for_diagram(vec![
            async_item("app", "fetch", 1),
            async_item("app", "parse", 2),
        ]);

        assert!(sequence[0].is_async_block_start);
        assert!(sequence[1].is_async_block_end);
        assert_eq!(sequence[0].display_id, Some(0));
        assert_eq!(sequence[1].display_id, Some(1));
    }
}
