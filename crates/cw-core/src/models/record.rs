use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// One observed method call, as produced by the language extractors.
///
/// The `caller` is a dotted path ("main", "main.outer", "obj.methodA")
/// encoding who made the call; `lineno` is the only reliable ordering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Dotted caller path, e.g. "main.process_data"
    pub caller: String,
    /// Name of the called method/function
    pub method: String,
    /// Textual argument representations, passed through untouched
    #[serde(default)]
    pub args: Vec<String>,
    /// 1-based source line of the call
    #[serde(default)]
    pub lineno: u32,
    /// Call happens in an asynchronous context
    #[serde(default)]
    pub is_async: bool,
    /// Call is guarded by a condition
    #[serde(default)]
    pub is_conditional: bool,
    /// Condition text, empty when not conditional
    #[serde(default)]
    pub condition: String,
}

impl CallRecord {
    /// Builds a record with defaulted flags, mainly for tests and fixtures
    pub fn new(caller: impl Into<String>, method: impl Into<String>, lineno: u32) -> Self {
        Self {
            caller: caller.into(),
            method: method.into(),
            args: Vec::new(),
            lineno,
            is_async: false,
            is_conditional: false,
            condition: String::new(),
        }
    }

    /// Checks the extractor contract: `caller` and `method` must be present.
    ///
    /// Optional fields (`args`, `lineno`, flags) default and are never an
    /// error; only shape violations fail.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.caller.is_empty() {
            return Err(ValidationError::MissingField {
                field: "caller",
                lineno: self.lineno,
            });
        }
        if self.method.is_empty() {
            return Err(ValidationError::MissingField {
                field: "method",
                lineno: self.lineno,
            });
        }
        Ok(())
    }
}

/// One observed object instantiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationRecord {
    /// Class/constructor name instantiated
    #[serde(rename = "class")]
    pub class_name: String,
    /// Constructor argument representations
    #[serde(default)]
    pub args: Vec<String>,
    /// Variable the result is assigned to; None for inline creations
    #[serde(default)]
    pub target: Option<String>,
    /// 1-based source line of the creation expression
    #[serde(default)]
    pub lineno: u32,
}

impl CreationRecord {
    pub fn new(class_name: impl Into<String>, target: Option<&str>, lineno: u32) -> Self {
        Self {
            class_name: class_name.into(),
            args: Vec::new(),
            target: target.map(|t| t.to_string()),
            lineno,
        }
    }

    /// Checks the extractor contract: the class name must be present
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.class_name.is_empty() {
            return Err(ValidationError::MissingClass {
                lineno: self.lineno,
            });
        }
        Ok(())
    }
}
