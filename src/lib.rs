//! ansible-charm - Juju hook state as Ansible host vars
//!
//! Lets a Juju charm declare its machine state in Ansible playbooks. Before
//! every playbook run, the charm config, unit identity and relation data
//! known to Juju are merged into a persistent YAML vars file that Ansible
//! reads for localhost.
//!
//! # Architecture
//!
//! - Each hook captures a snapshot of the host framework state
//! - The snapshot is flattened and merged over the previously written vars
//! - The vars file is rewritten in full, then the playbook runs with the
//!   hook name as its tag
//!
//! # Modules
//!
//! - `adapters`: External systems (Juju hook tools, ansible-playbook, apt)
//! - `core`: State materialization and hook dispatch
//! - `domain`: Data structures (Value, RelationTree, HookSnapshot)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Write the vars file from inside a hook context
//! ansible-charm materialize --no-hyphens
//!
//! # Run the playbook for a hook
//! ansible-charm hook config-changed
//!
//! # Or symlink hooks to the binary
//! ln -s ../bin/ansible-charm hooks/install
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{AnsibleHooks, CatchAllTag, MergeOptions, StateError, VarsFile};
pub use domain::{HookSnapshot, Identity, Mapping, RelationTree, Value};
