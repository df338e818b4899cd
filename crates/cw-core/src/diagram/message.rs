use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Kind of conditional construct a message or block belongs to.
///
/// Tags mirror the conditional detector vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    IfStatement,
    IfElifChain,
    Ternary,
    SwitchCase,
    TryExcept,
    TryCatch,
    ForLoop,
    WhileLoop,
    IfBreak,
    IfContinue,
}

impl ConditionKind {
    /// Whether this kind denotes a loop construct
    pub fn is_loop(self) -> bool {
        matches!(self, ConditionKind::ForLoop | ConditionKind::WhileLoop)
    }
}

/// Loop control transfer guarded by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopControl {
    Break,
    Continue,
}

/// One message of a rendered sequence diagram, call or return
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default)]
    pub lineno: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Stable message id ("message_3"), present in conditional diagrams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Execution track the message belongs to, present in async diagrams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_return: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_conditional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<ConditionKind>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_cycle_ref: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_awaited: bool,
    /// Control is handed back at this message (await or equivalent)
    #[serde(default, skip_serializing_if = "is_false")]
    pub suspend_point: bool,
    /// Track this message spawned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creates_track: Option<String>,
    /// Track execution resumed on after a suspend point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns_to_track: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub in_conditional_block: bool,
    /// Condition of the innermost enclosing conditional block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_control: Option<LoopControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Base sequence diagram: participants plus ordered messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDiagram {
    pub participants: Vec<String>,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Sequence diagram enriched with parallel execution lanes.
///
/// `execution_tracks` maps track names to the indices of the messages
/// attributed to each lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncDiagram {
    pub participants: Vec<String>,
    pub messages: Vec<Message>,
    pub execution_tracks: IndexMap<String, Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Sequence diagram enriched with conditional regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalDiagram {
    pub participants: Vec<String>,
    pub messages: Vec<Message>,
    pub conditional_blocks: Vec<ConditionalBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Conditional region, referenced by its first and last message id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBlock {
    pub start_message_id: String,
    pub end_message_id: String,
    pub condition: String,
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub has_else: bool,
    pub nesting_level: u32,
    pub is_loop: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn async_diagram_round_trips_through_json() {
        let diagram = AsyncDiagram {
            participants: vec!["app".to_string()],
            messages: vec![Message {
                from: "app".to_string(),
                to: "app".to_string(),
                method: "fetch".to_string(),
                lineno: 1,
                track: Some("main".to_string()),
                is_async: true,
                creates_track: Some("async_1".to_string()),
                ..Message::default()
            }],
            execution_tracks: IndexMap::from([
                ("main".to_string(), vec![0]),
                ("async_1".to_string(), Vec::new()),
            ]),
            title: None,
        };

        let json = serde_json::to_string(&diagram).expect("diagram serializes");
        assert!(json.contains("\"execution_tracks\""));
        let parsed: AsyncDiagram = serde_json::from_str(&json).expect("diagram parses");
        assert_eq!(parsed, diagram);
    }

    #[test]
    fn unset_message_flags_are_omitted_from_the_wire_form() {
        let message = Message {
            from: "a".to_string(),
            to: "a".to_string(),
            method: "run".to_string(),
            lineno: 3,
            ..Message::default()
        };
        let json = serde_json::to_string(&message).expect("message serializes");
        assert!(!json.contains("is_return"));
        assert!(!json.contains("creates_track"));

        let parsed: Message = serde_json::from_str(&json).expect("message parses");
        assert_eq!(parsed, message);
    }
}
