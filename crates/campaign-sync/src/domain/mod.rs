//! # Domain Module
//!
//! Core domain types: entities, events, invariants, and errors.

pub mod entities;
pub mod errors;
pub mod events;
pub mod invariants;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use events::*;
pub use invariants::*;
pub use value_objects::*;
