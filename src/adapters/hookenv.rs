//! Host framework queries.
//!
//! Inside a Juju hook the unit's config, identity and relation data are
//! only reachable through environment variables and the hook tools
//! (`config-get`, `unit-get`, `relation-get`, ...). `JujuHookEnv` wraps
//! those; everything downstream works on a [`HookSnapshot`] instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::snapshot::service_from_unit;
use crate::domain::{HookSnapshot, Identity, Mapping, RelationTree, RelationUnits, Value};

/// Which unit address to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Private,
    Public,
}

impl AddressKind {
    /// Attribute name understood by `unit-get`
    pub fn attribute(&self) -> &'static str {
        match self {
            Self::Private => "private-address",
            Self::Public => "public-address",
        }
    }
}

/// Read-only view of the host framework for one hook invocation
pub trait HookEnvironment {
    /// Current charm configuration
    fn config(&self) -> Result<Mapping>;

    /// Local unit name, e.g. `svc/1`
    fn local_unit(&self) -> Result<String>;

    /// Service name of the local unit
    fn service_name(&self) -> Result<String> {
        Ok(service_from_unit(&self.local_unit()?).to_string())
    }

    fn unit_address(&self, kind: AddressKind) -> Result<String>;

    /// Charm directory, empty when unknown
    fn charm_dir(&self) -> String;

    /// Active relation name, `None` outside relation hooks
    fn relation_type(&self) -> Option<String>;

    /// Data published by the remote unit of the active relation
    fn relation_get(&self) -> Result<Mapping>;

    /// Every declared relation with all instances and unit data
    fn relations(&self) -> Result<RelationTree>;
}

impl HookSnapshot {
    /// Query everything the merger needs, once
    pub fn capture(env: &dyn HookEnvironment) -> Result<Self> {
        let identity = Identity {
            charm_dir: env.charm_dir(),
            local_unit: env.local_unit()?,
            service_name: env.service_name()?,
            private_address: env.unit_address(AddressKind::Private)?,
            public_address: env.unit_address(AddressKind::Public)?,
        };

        let relation_type = env.relation_type();
        let relation_data = if relation_type.is_some() {
            env.relation_get()?
        } else {
            Mapping::new()
        };

        Ok(Self {
            config: env.config()?,
            identity,
            relation_type,
            relation_data,
            relations: env.relations()?,
        })
    }
}

/// Relation sections of `metadata.yaml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharmMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provides: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub requires: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub peers: BTreeMap<String, serde_yaml::Value>,
}

impl CharmMetadata {
    /// Load `metadata.yaml` from a charm directory
    pub fn load(charm_dir: &Path) -> Result<Self> {
        let path = charm_dir.join("metadata.yaml");
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read charm metadata: {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse charm metadata: {}", path.display()))
    }

    /// All relation names, in provides/requires/peers order
    pub fn relation_types(&self) -> Vec<String> {
        self.provides
            .keys()
            .chain(self.requires.keys())
            .chain(self.peers.keys())
            .cloned()
            .collect()
    }
}

/// Juju hook context read from the environment and hook tools
#[derive(Debug, Clone, Default)]
pub struct JujuHookEnv {
    /// `JUJU_UNIT_NAME`
    pub unit_name: Option<String>,

    /// `CHARM_DIR`
    pub charm_dir: Option<PathBuf>,

    /// `JUJU_RELATION`
    pub relation: Option<String>,

    /// Directory holding the hook tools; `PATH` lookup when unset
    pub tool_dir: Option<PathBuf>,
}

impl JujuHookEnv {
    /// Read the hook context from the process environment
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            unit_name: non_empty("JUJU_UNIT_NAME"),
            charm_dir: non_empty("CHARM_DIR").map(PathBuf::from),
            relation: non_empty("JUJU_RELATION"),
            tool_dir: None,
        }
    }

    fn tool_path(&self, tool: &str) -> PathBuf {
        match &self.tool_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    /// Run a hook tool with `--format=json` and parse its output
    fn run_tool(&self, tool: &str, args: &[&str]) -> Result<serde_json::Value> {
        debug!(tool, ?args, "Running hook tool");

        let output = Command::new(self.tool_path(tool))
            .arg("--format=json")
            .args(args)
            .output()
            .with_context(|| format!("Failed to run hook tool '{}'", tool))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "Hook tool '{}' failed with exit code {}: {}",
                tool,
                exit_code,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8(output.stdout)
            .with_context(|| format!("Hook tool '{}' output is not valid UTF-8", tool))?;
        if stdout.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&stdout)
            .with_context(|| format!("Failed to parse '{}' output as JSON", tool))
    }

    fn tool_mapping(&self, tool: &str, args: &[&str]) -> Result<Mapping> {
        match Value::from(self.run_tool(tool, args)?) {
            Value::Mapping(mapping) => Ok(mapping),
            Value::Null => Ok(Mapping::new()),
            other => anyhow::bail!("Expected a mapping from '{}', got {:?}", tool, other),
        }
    }

    fn tool_list(&self, tool: &str, args: &[&str]) -> Result<Vec<String>> {
        let json = self.run_tool(tool, args)?;
        if json.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(json).with_context(|| format!("Expected a list from '{}'", tool))
    }

    fn relation_ids(&self, relation_type: &str) -> Result<Vec<String>> {
        self.tool_list("relation-ids", &[relation_type])
    }

    fn related_units(&self, rid: &str) -> Result<Vec<String>> {
        self.tool_list("relation-list", &["-r", rid])
    }

    fn unit_relation_data(&self, rid: &str, unit: &str) -> Result<Mapping> {
        self.tool_mapping("relation-get", &["-r", rid, "-", unit])
    }
}

impl HookEnvironment for JujuHookEnv {
    fn config(&self) -> Result<Mapping> {
        self.tool_mapping("config-get", &["--all"])
    }

    fn local_unit(&self) -> Result<String> {
        self.unit_name
            .clone()
            .context("JUJU_UNIT_NAME is not set; not running inside a hook?")
    }

    fn unit_address(&self, kind: AddressKind) -> Result<String> {
        match self.run_tool("unit-get", &[kind.attribute()])? {
            serde_json::Value::String(address) => Ok(address),
            serde_json::Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }

    fn charm_dir(&self) -> String {
        self.charm_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default()
    }

    fn relation_type(&self) -> Option<String> {
        self.relation.clone()
    }

    fn relation_get(&self) -> Result<Mapping> {
        // departed/broken hooks have no remote data to read
        match self.tool_mapping("relation-get", &["-"]) {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!(error = %e, "No data for the active relation");
                Ok(Mapping::new())
            }
        }
    }

    fn relations(&self) -> Result<RelationTree> {
        let Some(charm_dir) = &self.charm_dir else {
            return Ok(RelationTree::new());
        };
        let local_unit = self.local_unit()?;
        let metadata = CharmMetadata::load(charm_dir)?;

        let mut tree = RelationTree::new();
        for relation_type in metadata.relation_types() {
            let instances = tree.entry(relation_type.clone()).or_default();

            for rid in self.relation_ids(&relation_type)? {
                let mut units = RelationUnits::new();
                let mut members = self.related_units(&rid)?;
                members.push(local_unit.clone());

                for unit in members {
                    let data = self.unit_relation_data(&rid, &unit)?;
                    units.insert(unit, data);
                }
                instances.insert(rid, units);
            }
        }

        Ok(tree)
    }
}
