// Common types and utilities shared across the engine

pub mod entity_ids;
pub mod errors;
pub mod id;

pub use entity_ids::*;
pub use errors::{EngineError, EngineResult};
pub use id::{Id, V7};
