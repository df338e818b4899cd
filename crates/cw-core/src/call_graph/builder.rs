use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

use crate::call_graph::CallGraphNode;
use crate::error::ValidationError;
use crate::models::{id_segments, parent_suffixes, CallRecord, CallerPath, CreationRecord};

/// Child attachment resolved by the builder, before trees are assembled
struct ChildLink {
    id: String,
    cycle_ref: bool,
}

/// Builds a hierarchical call forest from flat method calls and object
/// creations.
///
/// Parent/child relationships are inferred from the dotted caller strings:
/// directly (the caller string of a call names its parent), by suffix
/// matching for partially qualified callers, and by linking calls on a
/// variable to the creation that produced it. Recursive relationships are
/// converted into terminal cycle-reference nodes so the result is always a
/// forest.
///
/// Returns root nodes sorted by ascending line number. Unresolvable
/// parents are not an error: the call becomes a root.
pub fn build_call_graph(
    method_calls: &[CallRecord],
    object_creations: Option<&[CreationRecord]>,
) -> Result<Vec<CallGraphNode>, ValidationError> {
    for call in method_calls {
        call.validate()?;
    }
    if let Some(creations) = object_creations {
        for creation in creations {
            creation.validate()?;
        }
    }

    // Merge calls and creations into one operation list ordered by line
    // number, the single global ordering key.
    enum Operation<'a> {
        Call(&'a CallRecord),
        Creation(&'a CreationRecord),
    }

    let mut operations: Vec<Operation> = method_calls.iter().map(Operation::Call).collect();
    if let Some(creations) = object_creations {
        operations.extend(creations.iter().map(Operation::Creation));
    }
    operations.sort_by_key(|op| match op {
        Operation::Call(call) => call.lineno,
        Operation::Creation(creation) => creation.lineno,
    });

    // Materialize exactly one node per unique id, in line order. IndexMap
    // keeps node-creation order observable, which is the deterministic
    // tie-break for every lookup below.
    let mut nodes: IndexMap<String, CallGraphNode> = IndexMap::new();
    // target variable -> creation node id
    let mut object_nodes: IndexMap<String, String> = IndexMap::new();

    for op in &operations {
        let (node, node_id) = match op {
            Operation::Call(call) => {
                let node = {
                    let mut node = CallGraphNode::new(
                        call.caller.clone(),
                        call.method.clone(),
                        call.args.clone(),
                        call.lineno,
                    );
                    node.is_async = call.is_async;
                    node.is_conditional = call.is_conditional;
                    if call.is_conditional {
                        node.condition = call.condition.clone();
                    }
                    node
                };
                let id = node.node_id();
                (node, id)
            }
            Operation::Creation(creation) => {
                let mut node = CallGraphNode::new(
                    "Constructor",
                    creation.class_name.clone(),
                    creation.args.clone(),
                    creation.lineno,
                );
                node.is_object_creation = true;
                node.target_object = creation.target.clone();
                let id = node.node_id();
                (node, id)
            }
        };

        if nodes.contains_key(&node_id) {
            // First occurrence wins
            debug!(node_id = %node_id, "duplicate operation id, keeping first occurrence");
            continue;
        }
        if let Some(target) = &node.target_object {
            // Last creation of a target wins the linkage slot
            object_nodes.insert(target.clone(), node_id.clone());
        }
        nodes.insert(node_id, node);
    }

    // child id -> parent id
    let mut parent_map: IndexMap<String, String> = IndexMap::new();

    for (node_id, node) in &nodes {
        if node.is_object_creation {
            continue;
        }

        // Direct inference: "A.B" calling "C" means method B is the parent.
        if let Some(parent_id) = CallerPath::parse(&node.caller).parent_id() {
            if parent_id != *node_id && nodes.contains_key(&parent_id) {
                parent_map.insert(node_id.clone(), parent_id);
                continue;
            }
        }

        // Suffix fallback for partially qualified callers: look for any
        // other node whose id ends with a dotted suffix of this id,
        // shortest suffix first, candidates in node-creation order.
        if let Some(parent_id) = find_suffix_parent(node_id, &nodes) {
            parent_map.insert(node_id.clone(), parent_id);
        }
    }

    // Creation linkage: a call on a created variable with no parent yet
    // hangs off the creation, provided the creation is not on a later line.
    for (node_id, node) in &nodes {
        if node.is_object_creation || parent_map.contains_key(node_id) {
            continue;
        }
        let base_object = CallerPath::parse(&node.caller).base_object().to_string();
        if let Some(creation_id) = object_nodes.get(&base_object) {
            let creation = &nodes[creation_id];
            if creation.lineno <= node.lineno {
                parent_map.insert(node_id.clone(), creation_id.clone());
            }
        }
    }

    // Resolve attachments, converting would-be cycles into terminal
    // cycle-reference children.
    let mut children: IndexMap<String, Vec<ChildLink>> = IndexMap::new();

    for (child_id, parent_id) in &parent_map {
        let cycle = creates_cycle(child_id, parent_id, &nodes, &parent_map, &children);
        if cycle {
            debug!(child = %child_id, parent = %parent_id, "recursive call converted to cycle reference");
        }
        children.entry(parent_id.clone()).or_default().push(ChildLink {
            id: child_id.clone(),
            cycle_ref: cycle,
        });
    }

    // Roots: nodes that were never assigned a parent.
    let mut roots: Vec<CallGraphNode> = nodes
        .keys()
        .filter(|id| !parent_map.contains_key(*id))
        .map(|id| assemble(id, &nodes, &children))
        .collect();

    roots.sort_by_key(|node| node.lineno);
    Ok(roots)
}

/// Finds a parent for a partially qualified id by suffix matching.
///
/// Tie-break is deliberate and fixed: shortest suffix first, then earliest
/// node in creation order.
fn find_suffix_parent(node_id: &str, nodes: &IndexMap<String, CallGraphNode>) -> Option<String> {
    if id_segments(node_id).len() <= 2 {
        return None;
    }
    for suffix in parent_suffixes(node_id) {
        let needle = format!(".{}", suffix);
        let mut matches = nodes
            .keys()
            .filter(|candidate| *candidate != node_id && candidate.ends_with(&needle));
        if let Some(parent_id) = matches.next() {
            if matches.next().is_some() {
                debug!(
                    node_id = %node_id,
                    suffix = %suffix,
                    parent = %parent_id,
                    "ambiguous suffix match, picked earliest node in creation order"
                );
            }
            return Some(parent_id.clone());
        }
    }
    None
}

/// Checks whether attaching `child_id` under `parent_id` would close a
/// cycle.
///
/// Two complementary checks: the parent must not already be reachable
/// through the child's attached descendants, and the child's call identity
/// must not already appear on the parent's ancestor chain (the signature
/// of a method indirectly calling itself).
fn creates_cycle(
    child_id: &str,
    parent_id: &str,
    nodes: &IndexMap<String, CallGraphNode>,
    parent_map: &IndexMap<String, String>,
    children: &IndexMap<String, Vec<ChildLink>>,
) -> bool {
    let child_identity = nodes[child_id].call_identity();
    let parent_identity = nodes[parent_id].call_identity();

    if child_id == parent_id || child_identity == parent_identity {
        return true;
    }

    // Descendant check: walk the child's prospective subtree.
    let mut stack: Vec<&str> = vec![child_id];
    let mut seen: HashSet<&str> = HashSet::new();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if id == parent_id || nodes[id].call_identity() == parent_identity {
            if id != child_id {
                return true;
            }
        }
        if let Some(links) = children.get(id) {
            for link in links {
                if !link.cycle_ref {
                    stack.push(&link.id);
                }
            }
        }
    }

    // Ancestor check: walk up from the parent.
    let mut seen: HashSet<&str> = HashSet::new();
    let mut current = Some(parent_id);
    while let Some(id) = current {
        if !seen.insert(id) {
            break;
        }
        if id == child_id || nodes[id].call_identity() == child_identity {
            return true;
        }
        current = parent_map.get(id).map(String::as_str);
    }

    false
}

/// Materializes the owned tree rooted at `id` from the resolved links
fn assemble(
    id: &str,
    nodes: &IndexMap<String, CallGraphNode>,
    children: &IndexMap<String, Vec<ChildLink>>,
) -> CallGraphNode {
    let mut node = nodes[id].clone();
    if let Some(links) = children.get(id) {
        for link in links {
            if link.cycle_ref {
                node.add_child(nodes[&link.id].to_cycle_ref());
            } else {
                node.add_child(assemble(&link.id, nodes, children));
            }
        }
    }
    node
}
