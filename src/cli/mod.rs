//! Command-line interface for ansible-charm.
//!
//! Provides commands for writing the vars file, running playbooks,
//! dispatching hooks and installing Ansible. When the binary is invoked
//! through a hook symlink (`hooks/install -> ansible-charm`), it runs that
//! hook directly.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};

use crate::adapters::{AnsibleInstaller, AnsiblePlaybook, JujuHookEnv, PlaybookRequest, PlaybookRunner};
use crate::config::{self, paths, parse_mode, ResolvedConfig};
use crate::core::hooks::hook_name;
use crate::core::{AnsibleHooks, CatchAllTag, VarsFile};
use crate::domain::HookSnapshot;

/// ansible-charm - Juju hook state as Ansible host vars
#[derive(Parser, Debug)]
#[command(name = "ansible-charm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write config and relation state to the vars file
    Materialize {
        /// Vars file path
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Separator between relation name and key
        #[arg(short, long)]
        separator: Option<String>,

        /// Rewrite hyphens in config keys to underscores
        #[arg(long)]
        no_hyphens: bool,

        /// Octal file mode for the vars file (e.g. 0600)
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Write the vars file and run a playbook
    Apply {
        /// Playbook to run
        playbook: PathBuf,

        /// Tags to run (comma-separated)
        #[arg(short, long)]
        tags: Option<String>,

        /// Increase ansible verbosity (repeatable)
        #[arg(short, long, action = ArgAction::Count)]
        verbose: u8,

        /// Extra ansible module path
        #[arg(long)]
        module_path: Option<String>,
    },

    /// Run a hook: its handler, then the playbook tagged with its name
    Hook {
        /// Hook name or path (e.g. hooks/config-changed)
        hook: String,

        /// Playbook override
        #[arg(short, long)]
        playbook: Option<PathBuf>,

        /// Increase ansible verbosity (repeatable, overrides config)
        #[arg(short, long, action = ArgAction::Count)]
        verbose: u8,

        /// Extra tag appended after the hook name
        #[arg(long, value_enum)]
        catch_all: Option<CatchAllTag>,
    },

    /// Install ansible and write the local hosts file
    Install {
        /// Install from configured archives instead of the PPA
        #[arg(long)]
        no_ppa: bool,

        /// PPA to add before installing
        #[arg(long)]
        ppa: Option<String>,
    },

    /// Print the persisted vars
    Show {
        /// Vars file path
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = config::config()?;

        match self.command {
            Commands::Materialize {
                path,
                separator,
                no_hyphens,
                mode,
            } => materialize(config, path, separator, no_hyphens, mode),
            Commands::Apply {
                playbook,
                tags,
                verbose,
                module_path,
            } => apply(config, playbook, tags, verbose, module_path).await,
            Commands::Hook {
                hook,
                playbook,
                verbose,
                catch_all,
            } => {
                let verbosity = (verbose > 0).then_some(verbose);
                run_hook(config, &hook, playbook, verbosity, catch_all).await
            }
            Commands::Install { no_ppa, ppa } => install(config, no_ppa, ppa).await,
            Commands::Show { path } => show_vars(config, path),
            Commands::Config => show_config(config),
        }
    }
}

/// Hook name when invoked through a hook symlink rather than as the binary
pub fn hook_from_argv0(argv0: &str) -> Option<String> {
    let name = hook_name(argv0);
    (name != paths::BINARY_NAME && !name.is_empty()).then(|| name.to_string())
}

fn playbook_runner(config: &ResolvedConfig) -> AnsiblePlaybook {
    AnsiblePlaybook::new(
        config.vars.ansible_vars_file(),
        Arc::new(JujuHookEnv::from_env()),
    )
}

/// Write the vars file for the current hook context
fn materialize(
    config: &ResolvedConfig,
    path: Option<PathBuf>,
    separator: Option<String>,
    no_hyphens: bool,
    mode: Option<String>,
) -> Result<()> {
    let settings = &config.vars;
    let mut options = settings.merge_options();
    if let Some(separator) = separator {
        options.namespace_separator = separator;
    }
    if no_hyphens {
        options.allow_hyphens_in_keys = false;
    }
    let mode = match mode {
        Some(mode) => Some(parse_mode(&mode)?),
        None => settings.mode,
    };

    let vars_file = VarsFile::new(path.unwrap_or_else(|| settings.path.clone()))
        .with_options(options)
        .with_mode(mode);

    let snapshot = HookSnapshot::capture(&JujuHookEnv::from_env())?;
    let vars = vars_file.materialize(&snapshot)?;

    println!("Wrote {} keys to {}", vars.len(), vars_file.path().display());
    Ok(())
}

/// Write the vars file and run a playbook with the given tags
async fn apply(
    config: &ResolvedConfig,
    playbook: PathBuf,
    tags: Option<String>,
    verbosity: u8,
    module_path: Option<String>,
) -> Result<()> {
    let tags: Vec<String> = tags
        .map(|t| t.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let request = PlaybookRequest::new(playbook)
        .with_tags(tags)
        .with_verbosity(verbosity)
        .with_module_path(module_path);

    playbook_runner(config).run(&request).await
}

/// Dispatch a hook through the configured playbook
pub async fn run_hook(
    config: &ResolvedConfig,
    hook: &str,
    playbook: Option<PathBuf>,
    verbosity: Option<u8>,
    catch_all: Option<CatchAllTag>,
) -> Result<()> {
    let settings = &config.playbook;
    let hooks = AnsibleHooks::new(
        playbook.unwrap_or_else(|| settings.path.clone()),
        playbook_runner(config),
        config.charm_dir.clone(),
        &settings.default_hooks,
    )
    .with_modules(settings.modules.clone());

    hooks
        .execute(
            hook,
            verbosity.unwrap_or(settings.verbosity),
            catch_all.unwrap_or(settings.catch_all_tag),
        )
        .await
        .with_context(|| format!("Hook '{}' failed", hook_name(hook)))
}

/// Install ansible support
async fn install(config: &ResolvedConfig, no_ppa: bool, ppa: Option<String>) -> Result<()> {
    let from_ppa = config.install.from_ppa && !no_ppa;
    let installer = AnsibleInstaller {
        ppa: from_ppa.then(|| ppa.unwrap_or_else(|| config.install.ppa.clone())),
        ..Default::default()
    };

    installer.install().await?;
    println!("Ansible installed");
    Ok(())
}

/// Print the persisted vars file
fn show_vars(config: &ResolvedConfig, path: Option<PathBuf>) -> Result<()> {
    let vars_file = VarsFile::new(path.unwrap_or_else(|| config.vars.path.clone()));
    let vars = vars_file.load()?;

    if vars.is_empty() {
        println!("No vars in {}", vars_file.path().display());
        return Ok(());
    }

    print!("{}", serde_yaml::to_string(&vars)?);
    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("ansible-charm configuration");
    println!("{}", "=".repeat(40));
    match &config.config_file {
        Some(path) => println!("Config file:      {}", path.display()),
        None => println!("Config file:      (none, using defaults)"),
    }
    match &config.charm_dir {
        Some(dir) => println!("Charm dir:        {}", dir.display()),
        None => println!("Charm dir:        (CHARM_DIR not set)"),
    }

    println!("\nVars:");
    println!("  Path:           {}", config.vars.path.display());
    println!("  Separator:      {:?}", config.vars.namespace_separator);
    println!("  Allow hyphens:  {}", config.vars.allow_hyphens_in_keys);
    match config.vars.mode {
        Some(mode) => println!("  Mode:           {:04o}", mode),
        None => println!("  Mode:           (unchanged)"),
    }

    println!("\nPlaybook:");
    println!("  Path:           {}", config.playbook.path.display());
    println!("  Default hooks:  {}", config.playbook.default_hooks.join(", "));
    println!("  Verbosity:      {}", config.playbook.verbosity);
    println!("  Catch-all tag:  {:?}", config.playbook.catch_all_tag);
    for module in &config.playbook.modules {
        println!("  Module dir:     {}", module.display());
    }

    println!("\nInstall:");
    println!("  From PPA:       {}", config.install.from_ppa);
    println!("  PPA:            {}", config.install.ppa);

    Ok(())
}
