use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{CallRecord, CallerPath, CreationRecord};

/// One entry in an object's lifetime history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    /// Explicit instantiation observed in the source
    Creation {
        #[serde(rename = "class")]
        class_name: String,
        args: Vec<String>,
        lineno: u32,
    },
    /// Synthetic anchor for an object that was never explicitly created
    /// (parameter, global). Always at line 0.
    Inferred {
        #[serde(rename = "class")]
        class_name: String,
        lineno: u32,
    },
    /// Method call observed on the object
    MethodCall {
        method: String,
        args: Vec<String>,
        lineno: u32,
        /// Approximate sort position. Equals `lineno` for direct calls;
        /// intermediate entries are offset fractionally below the call's
        /// line. Not a source location.
        order_key: f64,
        is_async: bool,
        is_conditional: bool,
        condition: String,
        /// Entry synthesized for an intermediate segment of a dotted caller
        is_intermediate: bool,
    },
}

impl Interaction {
    /// Sort key used to order an object's history
    pub fn order_key(&self) -> f64 {
        match self {
            Interaction::Creation { lineno, .. } | Interaction::Inferred { lineno, .. } => {
                f64::from(*lineno)
            }
            Interaction::MethodCall { order_key, .. } => *order_key,
        }
    }
}

/// Builds per-object interaction histories for lifeline-style diagrams.
///
/// Every object gets a leading creation-like anchor: explicit creations
/// seed the map, and objects first seen through a call get a synthetic
/// `Inferred` entry at line 0.
pub fn build_object_lifetime_graph(
    method_calls: &[CallRecord],
    object_creations: &[CreationRecord],
) -> Result<IndexMap<String, Vec<Interaction>>, ValidationError> {
    for call in method_calls {
        call.validate()?;
    }
    for creation in object_creations {
        creation.validate()?;
    }

    let mut lifetimes: IndexMap<String, Vec<Interaction>> = IndexMap::new();

    for creation in object_creations {
        let Some(target) = &creation.target else {
            continue;
        };
        lifetimes.insert(
            target.clone(),
            vec![Interaction::Creation {
                class_name: creation.class_name.clone(),
                args: creation.args.clone(),
                lineno: creation.lineno,
            }],
        );
    }

    for call in method_calls {
        let path = CallerPath::parse(&call.caller);
        let object_name = path.base_object().to_string();

        lifetimes
            .entry(object_name)
            .or_insert_with(|| {
                vec![Interaction::Inferred {
                    class_name: capitalize(path.base_object()),
                    lineno: 0,
                }]
            })
            .push(Interaction::MethodCall {
                method: call.method.clone(),
                args: call.args.clone(),
                lineno: call.lineno,
                order_key: f64::from(call.lineno),
                is_async: call.is_async,
                is_conditional: call.is_conditional,
                condition: call.condition.clone(),
                is_intermediate: false,
            });

        // Nested callers ("A.B.C") also touch the intermediate objects.
        // These entries carry no argument data and only an approximate
        // position just below the call's line.
        let segments = path.segments();
        for i in 1..segments.len() {
            let parent_object = segments[..i].join(".");
            let parent_method = segments[i].clone();
            let Some(history) = lifetimes.get_mut(&parent_object) else {
                continue;
            };
            let depth_from_end = (segments.len() - i) as f64;
            history.push(Interaction::MethodCall {
                method: parent_method,
                args: Vec::new(),
                lineno: call.lineno,
                order_key: f64::from(call.lineno) - 0.1 * depth_from_end,
                is_async: false,
                is_conditional: false,
                condition: String::new(),
                is_intermediate: true,
            });
        }
    }

    for history in lifetimes.values_mut() {
        history.sort_by(|a, b| a.order_key().total_cmp(&b.order_key()));
    }

    Ok(lifetimes)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_creation_seeds_history() {
        let creations = vec![CreationRecord::new("User", Some("user"), 1)];
        let calls = vec![CallRecord::new("user", "login", 2)];

        let lifetimes = build_object_lifetime_graph(&calls, &creations).unwrap();
        let history = &lifetimes["user"];
        assert_eq!(history.len(), 2);
        assert!(matches!(&history[0], Interaction::Creation { class_name, .. } if class_name == "User"));
        assert!(matches!(&history[1], Interaction::MethodCall { method, .. } if method == "login"));
    }

    #[test]
    fn unseen_object_gets_inferred_anchor_at_line_zero() {
        let calls = vec![CallRecord::new("service", "start", 4)];
        let lifetimes = build_object_lifetime_graph(&calls, &[]).unwrap();

        let history = &lifetimes["service"];
        assert!(matches!(
            &history[0],
            Interaction::Inferred { class_name, lineno: 0 } if class_name == "Service"
        ));
    }

    #[test]
    fn intermediate_entries_sort_before_the_call() {
        let creations = vec![CreationRecord::new("Api", Some("api"), 1)];
        let calls = vec![CallRecord::new("api.client", "send", 5)];

        let lifetimes = build_object_lifetime_graph(&calls, &creations).unwrap();
        let history = &lifetimes["api"];
        // creation, intermediate "client", then the call itself
        assert_eq!(history.len(), 3);
        assert!(matches!(
            &history[2],
            Interaction::MethodCall { method, is_intermediate: false, .. } if method == "send"
        ));
        match &history[1] {
            Interaction::MethodCall {
                method,
                is_intermediate,
                order_key,
                lineno,
                ..
            } => {
                assert_eq!(method, "client");
                assert!(*is_intermediate);
                assert_eq!(*lineno, 5);
                assert!(*order_key < 5.0);
            }
            other => panic!("unexpected interaction: {:?}", other),
        }
    }
}
