pub mod item;
pub mod ordering;

pub use item::*;
pub use ordering::*;
