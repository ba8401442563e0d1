//! Ansible playbook adapter.
//!
//! Runs `ansible-playbook` against localhost with a local connection, after
//! the vars file has been brought up to date for the current hook.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, instrument};

use crate::core::VarsFile;
use crate::domain::HookSnapshot;

use super::hookenv::HookEnvironment;
use super::{PlaybookRequest, PlaybookRunner};

/// Playbook runner backed by the `ansible-playbook` binary
pub struct AnsiblePlaybook {
    /// Path to the ansible-playbook binary (default: "ansible-playbook")
    binary_path: String,

    /// Vars file written before every run
    vars_file: VarsFile,

    /// Source of hook state
    env: Arc<dyn HookEnvironment + Send + Sync>,
}

impl AnsiblePlaybook {
    pub fn new(vars_file: VarsFile, env: Arc<dyn HookEnvironment + Send + Sync>) -> Self {
        Self {
            binary_path: "ansible-playbook".to_string(),
            vars_file,
            env,
        }
    }

    /// Use a custom ansible-playbook binary
    pub fn with_binary_path(mut self, binary_path: impl Into<String>) -> Self {
        self.binary_path = binary_path.into();
        self
    }

    pub fn vars_path(&self) -> PathBuf {
        self.vars_file.path().to_path_buf()
    }

    /// Bring the vars file up to date for this hook
    fn write_vars(&self, verbosity: u8) -> Result<()> {
        let snapshot = HookSnapshot::capture(self.env.as_ref())?;
        self.vars_file.materialize(&snapshot)?;

        info!(path = %self.vars_file.path().display(), "ANSIBLE VARS");
        if verbosity > 1 {
            let content = std::fs::read_to_string(self.vars_file.path())
                .context("Failed to read back vars file")?;
            println!("{}", content);
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybookRunner for AnsiblePlaybook {
    fn name(&self) -> &str {
        "ansible-playbook"
    }

    #[instrument(skip(self, request), fields(playbook = %request.playbook.display()))]
    async fn run(&self, request: &PlaybookRequest) -> Result<()> {
        // state must be on disk before the playbook can see it
        self.write_vars(request.verbosity)?;

        let args = request.args();
        info!("{} {}", self.binary_path, args.join(" "));

        let status = Command::new(&self.binary_path)
            .args(&args)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to spawn {}", self.binary_path))?;

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            anyhow::bail!(
                "Playbook '{}' failed with exit code {}",
                request.playbook.display(),
                exit_code
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::JujuHookEnv;

    #[test]
    fn test_defaults() {
        let runner = AnsiblePlaybook::new(
            VarsFile::new("/etc/ansible/host_vars/localhost"),
            Arc::new(JujuHookEnv::default()),
        );
        assert_eq!(runner.name(), "ansible-playbook");
        assert_eq!(runner.binary_path, "ansible-playbook");
        assert_eq!(runner.vars_path(), PathBuf::from("/etc/ansible/host_vars/localhost"));
    }

    #[tokio::test]
    async fn test_vars_failure_prevents_spawn() {
        // no JUJU_UNIT_NAME, so capturing state fails before anything runs
        let runner = AnsiblePlaybook::new(
            VarsFile::new("/nonexistent/never/written"),
            Arc::new(JujuHookEnv::default()),
        )
        .with_binary_path("/nonexistent/ansible-playbook");

        let err = runner
            .run(&PlaybookRequest::new("site.yaml"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("JUJU_UNIT_NAME"));
    }
}
