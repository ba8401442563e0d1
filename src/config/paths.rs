//! Canonical paths and well-known locations.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! | Location | Owner | Purpose |
//! |----------|-------|---------|
//! | `DEFAULT_VARS_PATH` | ansible-charm | Persisted hook state, read by Ansible |
//! | `ANSIBLE_HOSTS` | ansible-charm (if missing) | Inventory with a local entry |
//! | `<charm>/hooks`, `<charm>/modules` | charm author | Hook symlinks, extra modules |

use std::path::{Path, PathBuf};

/// Ansible includes this file automatically when running against localhost
pub const DEFAULT_VARS_PATH: &str = "/etc/ansible/host_vars/localhost";

/// Inventory file ansible-playbook reads by default
pub const ANSIBLE_HOSTS: &str = "/etc/ansible/hosts";

/// PPA providing ansible packages
pub const DEFAULT_PPA: &str = "ppa:rquillo/ansible";

/// Playbook run for hooks when none is configured (relative to the charm)
pub const DEFAULT_PLAYBOOK: &str = "playbooks/site.yaml";

/// Config file name, looked up in the charm directory
pub const CONFIG_FILE_NAME: &str = "ansible-charm.yaml";

/// Binary name; any other invocation name is treated as a hook
pub const BINARY_NAME: &str = "ansible-charm";

/// Hook symlinks directory of a charm
pub fn hooks_dir(charm_dir: &Path) -> PathBuf {
    charm_dir.join("hooks")
}

/// Charm-provided ansible modules
pub fn modules_dir(charm_dir: &Path) -> PathBuf {
    charm_dir.join("modules")
}
