pub mod call_graph;
pub mod diagram;
pub mod error;
pub mod logging;
pub mod models;
pub mod sequence;

pub use error::{CwError, ValidationError};
pub use logging::{init, init_default, init_from_env};
