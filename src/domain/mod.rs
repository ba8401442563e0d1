//! Domain types for ansible-charm.
//!
//! This module contains the data the state materializer works on:
//! - Value: Tagged union for config and relation values
//! - Relation: Relation tree and flattened record markers
//! - Snapshot: Unit identity and per-hook host state

pub mod relation;
pub mod snapshot;
pub mod value;

// Re-export commonly used types
pub use relation::{
    RelationInstances, RelationTree, RelationUnits, RELID_MARKER, UNIT_MARKER,
};
pub use snapshot::{HookSnapshot, Identity};
pub use value::{Mapping, Value};
