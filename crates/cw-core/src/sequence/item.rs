use crate::models::CallerPath;
use serde::{Deserialize, Serialize};

/// One entry of the flattened, execution-linear call sequence.
///
/// Carries the same payload as the graph node it was derived from, plus
/// the nesting `depth` of the linear walk. Distinct from `CallGraphNode`
/// on purpose: the tree and the linear order are separate concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceItem {
    pub caller: String,
    pub method: String,
    pub args: Vec<String>,
    pub lineno: u32,
    /// Nesting level in the linear walk (0 for roots)
    pub depth: u32,
    /// Rendering-only position id, assigned by
    /// `optimize_sequence_for_diagram`
    pub display_id: Option<usize>,
    pub is_cycle_ref: bool,
    pub is_async: bool,
    pub is_conditional: bool,
    pub condition: String,
    pub is_object_creation: bool,
    pub target_object: Option<String>,
    /// First item of a run of async calls from the same caller
    pub is_async_block_start: bool,
    /// Last item of a run of async calls from the same caller
    pub is_async_block_end: bool,
    /// First item of a run sharing the same condition
    pub is_conditional_block_start: bool,
    /// Last item of a run sharing the same condition
    pub is_conditional_block_end: bool,
}

impl SequenceItem {
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
            depth: 0,
            display_id: None,
            is_cycle_ref: false,
            is_async: false,
            is_conditional: false,
            condition: String::new(),
            is_object_creation: false,
            target_object: None,
            is_async_block_start: false,
            is_async_block_end: false,
            is_conditional_block_start: false,
            is_conditional_block_end: false,
        }
    }

    /// Node id of the graph node this item was derived from
    pub fn node_id(&self) -> String {
        if self.is_object_creation {
            format!("create.{}.{}", self.method, self.lineno)
        } else {
            format!("{}.{}", self.caller, self.method)
        }
    }

    /// Base object of the caller chain
    pub fn base_object(&self) -> String {
        CallerPath::parse(&self.caller).base_object().to_string()
    }
}
