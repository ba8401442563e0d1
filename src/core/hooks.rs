//! Hook registration and dispatch.
//!
//! Every hook runs the charm's playbook restricted to tasks tagged with the
//! hook name. Charms can attach their own handler to a hook; it runs before
//! the playbook.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::adapters::{PlaybookRequest, PlaybookRunner};
use crate::config::paths;

/// Handler attached to a hook name
pub type HookHandler = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Extra tag appended after the hook name when running the playbook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CatchAllTag {
    /// Only the hook name
    #[default]
    #[serde(rename = "none")]
    #[value(name = "none")]
    HookOnly,

    /// Also run tasks tagged `any`
    Any,

    /// Also run tasks tagged `all`
    All,
}

impl CatchAllTag {
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::HookOnly => None,
            Self::Any => Some("any"),
            Self::All => Some("all"),
        }
    }

    /// Tags for a hook: its name, then the marker if any
    pub fn tags_for(&self, hook_name: &str) -> Vec<String> {
        let mut tags = vec![hook_name.to_string()];
        tags.extend(self.marker().map(str::to_string));
        tags
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("No handler registered for hook '{0}'")]
    Unregistered(String),

    #[error("Hook '{hook}' failed: {source}")]
    Failed {
        hook: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Hook name -> handler
#[derive(Default)]
pub struct HookRegistry {
    handlers: BTreeMap<String, HookHandler>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler, replacing any previous one for the same hook
    pub fn register<F>(&mut self, hook_name: impl Into<String>, handler: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(hook_name.into(), Box::new(handler));
    }

    /// Register a handler that does nothing, so only the playbook runs
    pub fn register_noop(&mut self, hook_name: impl Into<String>) {
        self.register(hook_name, || Ok(()));
    }

    pub fn contains(&self, hook_name: &str) -> bool {
        self.handlers.contains_key(hook_name)
    }

    /// Registered hook names, sorted
    pub fn hook_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Run the handler for a hook
    pub fn execute(&self, hook_name: &str) -> Result<(), HookError> {
        let handler = self
            .handlers
            .get(hook_name)
            .ok_or_else(|| HookError::Unregistered(hook_name.to_string()))?;

        handler().map_err(|source| HookError::Failed {
            hook: hook_name.to_string(),
            source,
        })
    }
}

/// Hook name from a hook path: `hooks/config-changed` -> `config-changed`
pub fn hook_name(hook_path: &str) -> &str {
    Path::new(hook_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(hook_path)
}

/// Hooks installed as symlinks in a charm's hooks directory
pub fn implicit_hook_names(hooks_dir: &Path) -> Vec<String> {
    let pattern = hooks_dir.join("*");
    let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|path| {
            path.symlink_metadata()
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false)
        })
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(String::from))
        .collect()
}

/// Runs a tagged playbook for every hook
pub struct AnsibleHooks<R: PlaybookRunner> {
    registry: HookRegistry,
    playbook: PathBuf,
    modules: Vec<PathBuf>,
    charm_dir: Option<PathBuf>,
    runner: R,
}

impl<R: PlaybookRunner> AnsibleHooks<R> {
    /// Create hooks for a playbook
    ///
    /// `default_hooks` plus any symlinked hooks under `<charm_dir>/hooks`
    /// get a no-op handler, so the playbook alone handles them.
    pub fn new(
        playbook: impl Into<PathBuf>,
        runner: R,
        charm_dir: Option<PathBuf>,
        default_hooks: &[String],
    ) -> Self {
        let mut registry = HookRegistry::new();

        let implicit = charm_dir
            .as_deref()
            .map(|dir| implicit_hook_names(&paths::hooks_dir(dir)))
            .unwrap_or_default();
        for hook in default_hooks.iter().chain(implicit.iter()) {
            registry.register_noop(hook.clone());
        }
        debug!(hooks = ?registry.hook_names().collect::<Vec<_>>(), "Registered hooks");

        Self {
            registry,
            playbook: playbook.into(),
            modules: Vec::new(),
            charm_dir,
            runner,
        }
    }

    /// Extra module directories passed to ansible
    pub fn with_modules(mut self, modules: Vec<PathBuf>) -> Self {
        self.modules = modules;
        self
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HookRegistry {
        &mut self.registry
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Module path: configured modules, then `<charm_dir>/modules` if present
    pub fn module_path(&self) -> String {
        let mut modules = self.modules.clone();
        if let Some(charm_modules) = self.charm_dir.as_deref().map(paths::modules_dir) {
            if charm_modules.exists() && !modules.contains(&charm_modules) {
                modules.push(charm_modules);
            }
        }

        modules
            .iter()
            .map(|m| m.display().to_string())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Run the hook's handler, then the playbook tagged with the hook name
    #[instrument(skip(self))]
    pub async fn execute(&self, hook_path: &str, verbosity: u8, catch_all: CatchAllTag) -> Result<()> {
        let hook = hook_name(hook_path);
        self.registry.execute(hook)?;

        let request = PlaybookRequest::new(&self.playbook)
            .with_tags(catch_all.tags_for(hook))
            .with_verbosity(verbosity)
            .with_module_path(Some(self.module_path()));

        info!(hook, runner = self.runner.name(), "Running playbook for hook");
        self.runner.run(&request).await
    }
}
