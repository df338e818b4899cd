pub mod activations;
pub mod async_tracks;
pub mod conditional;
pub mod generator;
pub mod message;

pub use activations::*;
pub use async_tracks::*;
pub use conditional::*;
pub use generator::*;
pub use message::*;
