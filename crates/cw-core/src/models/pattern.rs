use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Async pattern record produced by the external async detectors.
///
/// The tag values mirror the detector output (`async_function`,
/// `await_expression`, `promise_then`, ...) so records round-trip through
/// JSON unchanged. The enrichers only consume these via a lineno lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AsyncPattern {
    /// `async def f()` at module level
    AsyncFunction { name: String, lineno: u32 },
    /// `async def f()` inside a class
    AsyncMethod {
        class: String,
        method: String,
        lineno: u32,
    },
    /// `await expr`
    AwaitExpression {
        #[serde(default)]
        function: Option<String>,
        lineno: u32,
    },
    /// `.then(...)` chained call
    PromiseThen { caller: String, lineno: u32 },
    /// `.catch(...)` chained call
    PromiseCatch { caller: String, lineno: u32 },
    /// `threading.Thread(target=...)`
    Threading { target: String, lineno: u32 },
    /// `asyncio.create_task(...)`
    CreateTask {
        #[serde(default)]
        function: Option<String>,
        lineno: u32,
    },
    /// `asyncio.gather(...)`
    AsyncioGather {
        #[serde(default)]
        function: Option<String>,
        lineno: u32,
    },
    /// `asyncio.run(...)`
    AsyncioRun {
        #[serde(default)]
        function: Option<String>,
        lineno: u32,
    },
    /// Function taking a callback argument
    CallbackPattern {
        function: String,
        callback_arg: String,
        lineno: u32,
    },
}

impl AsyncPattern {
    /// Source line the pattern was detected on
    pub fn lineno(&self) -> u32 {
        match self {
            AsyncPattern::AsyncFunction { lineno, .. }
            | AsyncPattern::AsyncMethod { lineno, .. }
            | AsyncPattern::AwaitExpression { lineno, .. }
            | AsyncPattern::PromiseThen { lineno, .. }
            | AsyncPattern::PromiseCatch { lineno, .. }
            | AsyncPattern::Threading { lineno, .. }
            | AsyncPattern::CreateTask { lineno, .. }
            | AsyncPattern::AsyncioGather { lineno, .. }
            | AsyncPattern::AsyncioRun { lineno, .. }
            | AsyncPattern::CallbackPattern { lineno, .. } => *lineno,
        }
    }
}

/// Conditional pattern record produced by the external conditional detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionalPattern {
    /// Plain `if` (optionally with `else`)
    IfStatement {
        condition: String,
        #[serde(default)]
        has_else: bool,
        #[serde(default)]
        nesting_level: u32,
        lineno: u32,
    },
    /// `if`/`elif`/... chain
    IfElifChain {
        condition: String,
        #[serde(default = "default_branches")]
        branches: u32,
        #[serde(default)]
        has_else: bool,
        #[serde(default)]
        nesting_level: u32,
        lineno: u32,
    },
    /// Inline conditional expression
    Ternary { condition: String, lineno: u32 },
    /// `switch`/`case` (TS/JS)
    SwitchCase {
        switch_expression: String,
        #[serde(default)]
        has_default: bool,
        #[serde(default = "default_branches")]
        cases: u32,
        lineno: u32,
    },
    /// Python `try`/`except`
    TryExcept {
        #[serde(default)]
        has_handlers: bool,
        #[serde(default)]
        has_finally: bool,
        lineno: u32,
    },
    /// TS/JS `try`/`catch`
    TryCatch {
        #[serde(default)]
        error_variable: String,
        #[serde(default)]
        has_finally: bool,
        lineno: u32,
    },
    /// `for` loop
    ForLoop {
        #[serde(default)]
        target: String,
        #[serde(default)]
        iterable: String,
        #[serde(default)]
        has_else: bool,
        lineno: u32,
    },
    /// `while` loop
    WhileLoop {
        condition: String,
        #[serde(default)]
        has_else: bool,
        lineno: u32,
    },
    /// `if` guarding a `break`
    IfBreak { condition: String, lineno: u32 },
    /// `if` guarding a `continue`
    IfContinue { condition: String, lineno: u32 },
}

fn default_branches() -> u32 {
    1
}

impl ConditionalPattern {
    /// Source line the pattern was detected on
    pub fn lineno(&self) -> u32 {
        match self {
            ConditionalPattern::IfStatement { lineno, .. }
            | ConditionalPattern::IfElifChain { lineno, .. }
            | ConditionalPattern::Ternary { lineno, .. }
            | ConditionalPattern::SwitchCase { lineno, .. }
            | ConditionalPattern::TryExcept { lineno, .. }
            | ConditionalPattern::TryCatch { lineno, .. }
            | ConditionalPattern::ForLoop { lineno, .. }
            | ConditionalPattern::WhileLoop { lineno, .. }
            | ConditionalPattern::IfBreak { lineno, .. }
            | ConditionalPattern::IfContinue { lineno, .. } => *lineno,
        }
    }
}

/// Builds a lineno lookup over pattern records.
///
/// Last-write-wins for duplicate line numbers, matching the detector
/// contract.
pub fn lineno_lookup<P, F>(patterns: &[P], lineno: F) -> HashMap<u32, &P>
where
    F: Fn(&P) -> u32,
{
    let mut lookup = HashMap::new();
    for pattern in patterns {
        lookup.insert(lineno(pattern), pattern);
    }
    lookup
}
