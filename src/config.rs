//! Configuration for ansible-charm.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (applied by the CLI)
//! 2. Environment variables (ANSIBLE_CHARM_VARS_PATH, CHARM_DIR)
//! 3. Config file (ansible-charm.yaml)
//! 4. Defaults
//!
//! Config file discovery:
//! - `$CHARM_DIR/ansible-charm.yaml` when running inside a hook
//! - Otherwise the current directory and its parents are searched
//! - Paths in the config file are relative to the file's directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{CatchAllTag, MergeOptions, VarsFile};

pub mod paths;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub vars: VarsConfig,
    #[serde(default)]
    pub playbook: Option<PlaybookConfig>,
    #[serde(default)]
    pub install: Option<InstallConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VarsConfig {
    /// Vars file location
    pub path: Option<String>,
    /// Separator for namespaced relation keys (`materialize` only)
    pub namespace_separator: Option<String>,
    /// Keep hyphens in config keys (`materialize` only)
    pub allow_hyphens_in_keys: Option<bool>,
    /// Octal file mode, e.g. "0600"
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybookConfig {
    pub path: Option<String>,
    #[serde(default)]
    pub default_hooks: Vec<String>,
    pub verbosity: Option<u8>,
    pub catch_all_tag: Option<CatchAllTag>,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallConfig {
    pub from_ppa: Option<bool>,
    pub ppa: Option<String>,
}

/// Resolved configuration with absolute paths where known
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Charm directory (`CHARM_DIR`)
    pub charm_dir: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub vars: VarsSettings,
    pub playbook: PlaybookSettings,
    pub install: InstallSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarsSettings {
    pub path: PathBuf,
    pub namespace_separator: String,
    pub allow_hyphens_in_keys: bool,
    pub mode: Option<u32>,
}

impl Default for VarsSettings {
    fn default() -> Self {
        let merge = MergeOptions::default();
        Self {
            path: PathBuf::from(paths::DEFAULT_VARS_PATH),
            namespace_separator: merge.namespace_separator,
            allow_hyphens_in_keys: merge.allow_hyphens_in_keys,
            mode: None,
        }
    }
}

impl VarsSettings {
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            namespace_separator: self.namespace_separator.clone(),
            allow_hyphens_in_keys: self.allow_hyphens_in_keys,
        }
    }

    /// Vars file for playbook runs: same location, Ansible-safe keys
    pub fn ansible_vars_file(&self) -> VarsFile {
        VarsFile::new(&self.path)
            .with_options(MergeOptions::ansible())
            .with_mode(self.mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybookSettings {
    pub path: PathBuf,
    pub default_hooks: Vec<String>,
    pub verbosity: u8,
    pub catch_all_tag: CatchAllTag,
    pub modules: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    pub from_ppa: bool,
    pub ppa: String,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            from_ppa: true,
            ppa: paths::DEFAULT_PPA.to_string(),
        }
    }
}

/// Parse an octal file mode ("0600", "600" or "0o600")
pub fn parse_mode(mode: &str) -> Result<u32> {
    let digits = mode.trim().trim_start_matches("0o");
    let parsed = u32::from_str_radix(digits, 8)
        .with_context(|| format!("Invalid octal file mode: {}", mode))?;
    if parsed > 0o7777 {
        anyhow::bail!("File mode out of range: {}", mode);
    }
    Ok(parsed)
}

/// Find the config file in the charm directory, else in cwd and parents
fn find_config_file(charm_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = charm_dir {
        let candidate = dir.join(paths::CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(paths::CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: Option<&Path>, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

/// Combine a parsed config file with environment overrides
fn resolve(
    charm_dir: Option<PathBuf>,
    config_file: Option<(PathBuf, ConfigFile)>,
    vars_path_override: Option<PathBuf>,
) -> Result<ResolvedConfig> {
    // relative paths follow the config file, else the charm
    let base_dir = config_file
        .as_ref()
        .and_then(|(path, _)| path.parent().map(Path::to_path_buf))
        .or_else(|| charm_dir.clone());
    let base = base_dir.as_deref();

    let (config_path, file) = match config_file {
        Some((path, file)) => (Some(path), Some(file)),
        None => (None, None),
    };

    let defaults = VarsSettings::default();
    let vars_cfg = file.as_ref().map(|f| f.vars.clone()).unwrap_or_default();
    let vars = VarsSettings {
        path: vars_path_override
            .or_else(|| vars_cfg.path.as_deref().map(|p| resolve_path(base, p)))
            .unwrap_or(defaults.path),
        namespace_separator: vars_cfg
            .namespace_separator
            .unwrap_or(defaults.namespace_separator),
        allow_hyphens_in_keys: vars_cfg
            .allow_hyphens_in_keys
            .unwrap_or(defaults.allow_hyphens_in_keys),
        mode: vars_cfg.mode.as_deref().map(parse_mode).transpose()?,
    };

    let playbook_cfg = file.as_ref().and_then(|f| f.playbook.clone());
    let playbook = PlaybookSettings {
        path: resolve_path(
            base,
            playbook_cfg
                .as_ref()
                .and_then(|p| p.path.as_deref())
                .unwrap_or(paths::DEFAULT_PLAYBOOK),
        ),
        default_hooks: playbook_cfg
            .as_ref()
            .map(|p| p.default_hooks.clone())
            .unwrap_or_default(),
        verbosity: playbook_cfg.as_ref().and_then(|p| p.verbosity).unwrap_or(1),
        catch_all_tag: playbook_cfg
            .as_ref()
            .and_then(|p| p.catch_all_tag)
            .unwrap_or_default(),
        modules: playbook_cfg
            .as_ref()
            .map(|p| p.modules.iter().map(|m| resolve_path(base, m)).collect())
            .unwrap_or_default(),
    };

    let install_cfg = file.as_ref().and_then(|f| f.install.clone());
    let install_defaults = InstallSettings::default();
    let install = InstallSettings {
        from_ppa: install_cfg
            .as_ref()
            .and_then(|i| i.from_ppa)
            .unwrap_or(install_defaults.from_ppa),
        ppa: install_cfg
            .and_then(|i| i.ppa)
            .unwrap_or(install_defaults.ppa),
    };

    Ok(ResolvedConfig {
        charm_dir,
        config_file: config_path,
        vars,
        playbook,
        install,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let env_path = |name: &str| {
        std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    };

    let charm_dir = env_path("CHARM_DIR");
    let config_file = match find_config_file(charm_dir.as_deref()) {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    resolve(charm_dir, config_file, env_path("ANSIBLE_CHARM_VARS_PATH"))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(paths::CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, None, None).unwrap();

        assert_eq!(config.vars.path, PathBuf::from(paths::DEFAULT_VARS_PATH));
        assert_eq!(config.vars.namespace_separator, ":");
        assert!(config.vars.allow_hyphens_in_keys);
        assert_eq!(config.vars.mode, None);
        assert_eq!(config.playbook.path, PathBuf::from(paths::DEFAULT_PLAYBOOK));
        assert_eq!(config.playbook.verbosity, 1);
        assert_eq!(config.playbook.catch_all_tag, CatchAllTag::HookOnly);
        assert_eq!(config.install, InstallSettings::default());
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_playbook_relative_to_charm_dir() {
        let charm = PathBuf::from("/var/lib/juju/charm");
        let config = resolve(Some(charm.clone()), None, None).unwrap();

        assert_eq!(config.playbook.path, charm.join(paths::DEFAULT_PLAYBOOK));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
version: "1"
vars:
  path: state/vars.yaml
  namespace_separator: "__"
  allow_hyphens_in_keys: false
  mode: "0600"
playbook:
  path: playbooks/main.yaml
  default_hooks: [install, config-changed]
  verbosity: 2
  catch_all_tag: any
  modules: [library]
install:
  from_ppa: false
"#,
        );

        let file = load_config_file(&path).unwrap();
        assert_eq!(file.version, "1");

        let config = resolve(None, Some((path.clone(), file)), None).unwrap();
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.vars.path, temp.path().join("state/vars.yaml"));
        assert_eq!(config.vars.namespace_separator, "__");
        assert!(!config.vars.allow_hyphens_in_keys);
        assert_eq!(config.vars.mode, Some(0o600));
        assert_eq!(config.playbook.path, temp.path().join("playbooks/main.yaml"));
        assert_eq!(config.playbook.default_hooks, vec!["install", "config-changed"]);
        assert_eq!(config.playbook.verbosity, 2);
        assert_eq!(config.playbook.catch_all_tag, CatchAllTag::Any);
        assert_eq!(config.playbook.modules, vec![temp.path().join("library")]);
        assert!(!config.install.from_ppa);
        assert_eq!(config.install.ppa, paths::DEFAULT_PPA);
        assert_eq!(
            config.vars.merge_options(),
            MergeOptions {
                namespace_separator: "__".to_string(),
                allow_hyphens_in_keys: false,
            }
        );
    }

    #[test]
    fn test_env_vars_path_wins() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "version: \"1\"\nvars:\n  path: /from/file\n");
        let file = load_config_file(&path).unwrap();

        let config = resolve(None, Some((path, file)), Some(PathBuf::from("/from/env"))).unwrap();

        assert_eq!(config.vars.path, PathBuf::from("/from/env"));
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "version: \"1\"\nvars:\n  mode: \"0999\"\n");
        let file = load_config_file(&path).unwrap();

        assert!(resolve(None, Some((path, file)), None).is_err());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("0600").unwrap(), 0o600);
        assert_eq!(parse_mode("644").unwrap(), 0o644);
        assert_eq!(parse_mode("0o755").unwrap(), 0o755);
        assert!(parse_mode("rw-r--r--").is_err());
        assert!(parse_mode("77777").is_err());
    }

    #[test]
    fn test_ansible_vars_file_keeps_location_and_mode() {
        let settings = VarsSettings {
            mode: Some(0o640),
            ..Default::default()
        };

        let vars_file = settings.ansible_vars_file();
        assert_eq!(vars_file.path(), Path::new(paths::DEFAULT_VARS_PATH));
        assert_eq!(vars_file.options(), &MergeOptions::ansible());
    }
}
