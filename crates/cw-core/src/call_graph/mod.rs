pub mod builder;
pub mod lifetime;
pub mod node;

pub use builder::*;
pub use lifetime::*;
pub use node::*;
