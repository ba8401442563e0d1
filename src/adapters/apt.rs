//! Installing Ansible on the unit.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{info, instrument};

use crate::config::paths;

/// Hosts file content letting Ansible run against localhost
pub const LOCAL_HOSTS_ENTRY: &str = "localhost ansible_connection=local";

/// Installs the ansible package via apt
#[derive(Debug, Clone)]
pub struct AnsibleInstaller {
    /// PPA to add first; `None` installs from configured archives only
    pub ppa: Option<String>,

    /// Hosts file written after installation
    pub hosts_path: PathBuf,
}

impl Default for AnsibleInstaller {
    fn default() -> Self {
        Self {
            ppa: Some(paths::DEFAULT_PPA.to_string()),
            hosts_path: PathBuf::from(paths::ANSIBLE_HOSTS),
        }
    }
}

impl AnsibleInstaller {
    /// Add the PPA (if any), update, install ansible, write the hosts file
    #[instrument(skip(self), fields(ppa = ?self.ppa))]
    pub async fn install(&self) -> Result<()> {
        if let Some(ppa) = &self.ppa {
            info!(%ppa, "Adding apt source");
            apt_command("add-apt-repository", &["--yes", ppa.as_str()]).await?;
            apt_command("apt-get", &["update"]).await?;
        }

        info!("Installing ansible");
        apt_command("apt-get", &["install", "--yes", "ansible"]).await?;

        write_hosts_file(&self.hosts_path)?;
        Ok(())
    }
}

async fn apt_command(program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .env("DEBIAN_FRONTEND", "noninteractive")
        .status()
        .await
        .with_context(|| format!("Failed to spawn {}", program))?;

    if !status.success() {
        anyhow::bail!(
            "{} {} failed with exit code {}",
            program,
            args.join(" "),
            status.code().unwrap_or(-1)
        );
    }
    Ok(())
}

/// Write the Ansible hosts file if it is missing
///
/// Ansible refuses to run without an inventory entry. An existing file is
/// left alone. Returns whether the file was written.
pub fn write_hosts_file(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, LOCAL_HOSTS_ENTRY)
        .with_context(|| format!("Failed to write hosts file: {}", path.display()))?;

    info!(path = %path.display(), "Wrote ansible hosts file");
    Ok(true)
}
