use crate::models::CallerPath;
use serde::{Deserialize, Serialize};

/// Node in the reconstructed call forest.
///
/// A node exclusively owns its children; a node marked `is_cycle_ref` is a
/// terminal marker for a recursive relationship and its children are never
/// traversed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphNode {
    /// Dotted caller path of the call ("Constructor" for creations)
    pub caller: String,
    /// Called method name (class name for creations)
    pub method: String,
    /// Argument representations, passed through
    pub args: Vec<String>,
    /// Source line of the call/creation
    pub lineno: u32,
    /// Owned child nodes, in attachment order
    pub children: Vec<CallGraphNode>,
    /// Terminal marker for a cyclic relationship
    pub is_cycle_ref: bool,
    /// Node represents an object instantiation
    pub is_object_creation: bool,
    /// Variable the created object was assigned to
    pub target_object: Option<String>,
    /// Call happens in an asynchronous context
    pub is_async: bool,
    /// Call is guarded by a condition
    pub is_conditional: bool,
    /// Condition text, empty when not conditional
    pub condition: String,
}

impl CallGraphNode {
    pub fn new(
        caller: impl Into<String>,
        method: impl Into<String>,
        args: Vec<String>,
        lineno: u32,
    ) -> Self {
        Self {
            caller: caller.into(),
            method: method.into(),
            args,
            lineno,
            children: Vec::new(),
            is_cycle_ref: false,
            is_object_creation: false,
            target_object: None,
            is_async: false,
            is_conditional: false,
            condition: String::new(),
        }
    }

    /// Adds a child node called by this node
    pub fn add_child(&mut self, node: CallGraphNode) {
        self.children.push(node);
    }

    /// Node id: "{caller}.{method}" for calls, "create.{method}.{lineno}"
    /// for creations (creations are made unique by line so the same class
    /// can be instantiated more than once).
    pub fn node_id(&self) -> String {
        if self.is_object_creation {
            format!("create.{}.{}", self.method, self.lineno)
        } else {
            format!("{}.{}", self.caller, self.method)
        }
    }

    /// Call identity used for recursion detection: the base object plus the
    /// method name. Two calls with different caller chains but the same
    /// identity are the same method being re-entered. Creations use their
    /// full node id (unique per line, never cyclic).
    pub fn call_identity(&self) -> String {
        if self.is_object_creation {
            self.node_id()
        } else {
            format!(
                "{}.{}",
                CallerPath::parse(&self.caller).base_object(),
                self.method
            )
        }
    }

    /// Clone of this node's payload marked as a cycle reference.
    ///
    /// Children are not carried over: a cycle-ref node is terminal.
    pub fn to_cycle_ref(&self) -> CallGraphNode {
        CallGraphNode {
            caller: self.caller.clone(),
            method: self.method.clone(),
            args: self.args.clone(),
            lineno: self.lineno,
            children: Vec::new(),
            is_cycle_ref: true,
            is_object_creation: self.is_object_creation,
            target_object: self.target_object.clone(),
            is_async: self.is_async,
            is_conditional: self.is_conditional,
            condition: self.condition.clone(),
        }
    }
}

/// Finds a node in the forest by its id, skipping cycle references so the
/// search cannot loop.
pub fn find_node_by_id<'a>(
    root_nodes: &'a [CallGraphNode],
    target_id: &str,
) -> Option<&'a CallGraphNode> {
    fn search<'a>(node: &'a CallGraphNode, target_id: &str) -> Option<&'a CallGraphNode> {
        if node.node_id() == target_id {
            return Some(node);
        }
        for child in &node.children {
            if child.is_cycle_ref {
                continue;
            }
            if let Some(found) = search(child, target_id) {
                return Some(found);
            }
        }
        None
    }

    root_nodes.iter().find_map(|root| search(root, target_id))
}
