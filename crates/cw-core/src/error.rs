use thiserror::Error;

/// Top-level error for the analysis core
#[derive(Debug, Error)]
pub enum CwError {
    /// Input record violated the extractor contract
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Failed to deserialize extractor output
    #[error("failed to deserialize extractor output: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Shape violation in extractor-produced records.
///
/// Structurally unusual but well-typed input (missing parents, cycles,
/// duplicate ids) is resolved by policy and never raises; only contract
/// violations reach this type.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Required field is empty or absent
    #[error("call record at line {lineno} is missing required field `{field}`")]
    MissingField {
        /// Name of the missing field ("caller" or "method")
        field: &'static str,
        /// Line number of the offending record
        lineno: u32,
    },
    /// Creation record without a class name
    #[error("creation record at line {lineno} is missing its class name")]
    MissingClass {
        /// Line number of the offending record
        lineno: u32,
    },
}
