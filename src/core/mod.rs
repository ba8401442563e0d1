//! Core state materialization logic.
//!
//! This module contains:
//! - Keys: Hyphen normalization for Ansible-safe variable names
//! - Flatten: Relation tree -> namespaced and record views
//! - Merge: Layering config, identity and relation views
//! - VarsFile: Load, merge and rewrite the persisted vars
//! - Hooks: Hook registry and per-hook playbook dispatch

pub mod error;
pub mod flatten;
pub mod hooks;
pub mod keys;
pub mod merge;
pub mod vars_file;

// Re-export commonly used types
pub use error::StateError;
pub use flatten::{flatten_relations, FlattenInput, RelationViews};
pub use hooks::{AnsibleHooks, CatchAllTag, HookError, HookRegistry};
pub use keys::{normalize_key, without_hyphens};
pub use merge::{merge_into, merged_layer, MergeOptions};
pub use vars_file::VarsFile;
