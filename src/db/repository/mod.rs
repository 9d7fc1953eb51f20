//! Repository layer: entity-scoped database operations.

mod note;

pub use note::*;
