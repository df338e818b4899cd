pub mod path;
pub mod pattern;
pub mod record;

pub use path::*;
pub use pattern::*;
pub use record::*;
