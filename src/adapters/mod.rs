//! Adapter interfaces for external systems.
//!
//! Adapters wrap everything outside the process: the Juju hook tools,
//! the `ansible-playbook` binary, and apt.

pub mod ansible;
pub mod apt;
pub mod hookenv;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

// Re-export the adapters
pub use ansible::AnsiblePlaybook;
pub use apt::{write_hosts_file, AnsibleInstaller};
pub use hookenv::{AddressKind, CharmMetadata, HookEnvironment, JujuHookEnv};

/// A single playbook invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybookRequest {
    /// Playbook to run
    pub playbook: PathBuf,

    /// Only run tasks carrying one of these tags
    pub tags: Vec<String>,

    /// Number of `-v` flags
    pub verbosity: u8,

    /// Extra module search path (colon separated)
    pub module_path: Option<String>,
}

impl PlaybookRequest {
    pub fn new(playbook: impl Into<PathBuf>) -> Self {
        Self {
            playbook: playbook.into(),
            tags: Vec::new(),
            verbosity: 0,
            module_path: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_module_path(mut self, module_path: Option<String>) -> Self {
        self.module_path = module_path.filter(|p| !p.is_empty());
        self
    }

    /// Arguments passed to `ansible-playbook`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-c".to_string(), "local".to_string()];

        if self.verbosity > 0 {
            args.push(format!("-{}", "v".repeat(self.verbosity as usize)));
        }

        args.push(self.playbook.display().to_string());

        if !self.tags.is_empty() {
            args.push("--tags".to_string());
            args.push(self.tags.join(","));
        }

        if let Some(module_path) = &self.module_path {
            args.push(format!("--module-path={}", module_path));
        }

        args
    }
}

/// Trait for playbook execution backends
#[async_trait]
pub trait PlaybookRunner: Send + Sync {
    /// Human-readable runner name
    fn name(&self) -> &str;

    /// Materialize state and run the playbook
    async fn run(&self, request: &PlaybookRequest) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_args() {
        let request = PlaybookRequest::new("playbooks/dependencies.yaml");
        assert_eq!(
            request.args(),
            vec!["-c", "local", "playbooks/dependencies.yaml"]
        );
    }

    #[test]
    fn test_args_with_tags_and_verbosity() {
        let request = PlaybookRequest::new("playbooks/complete-state.yaml")
            .with_tags(vec!["install".to_string(), "somethingelse".to_string()])
            .with_verbosity(3);

        assert_eq!(
            request.args(),
            vec![
                "-c",
                "local",
                "-vvv",
                "playbooks/complete-state.yaml",
                "--tags",
                "install,somethingelse"
            ]
        );
    }

    #[test]
    fn test_module_path_flag() {
        let request = PlaybookRequest::new("site.yaml")
            .with_module_path(Some("/charm/modules:/extra".to_string()));
        assert_eq!(
            request.args().last().unwrap(),
            "--module-path=/charm/modules:/extra"
        );

        let empty = PlaybookRequest::new("site.yaml").with_module_path(Some(String::new()));
        assert!(empty.module_path.is_none());
    }
}
