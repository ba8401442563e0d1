//! The persisted vars file.
//!
//! Ansible picks up `/etc/ansible/host_vars/localhost` automatically when
//! running against localhost, so all config and relation state is written
//! there. The file accumulates: keys from earlier invocations stay until a
//! later invocation writes the same key.
//!
//! The file is written as JSON, which Ansible's YAML 1.1 loader reads
//! without guessing: every string is quoted, so values like `yes`, `on` or
//! `2001-01-01` stay strings. Floats always carry a decimal point.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use tracing::{debug, info, instrument};

use crate::domain::value::mapping_from_yaml;
use crate::domain::{HookSnapshot, Mapping};

use super::error::StateError;
use super::merge::{merge_into, merged_layer, MergeOptions};

/// Vars file at a fixed path with its write options
#[derive(Debug, Clone)]
pub struct VarsFile {
    path: PathBuf,
    options: MergeOptions,
    mode: Option<u32>,
}

impl VarsFile {
    /// Vars file with default merge options (`:` separator, hyphens kept)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: MergeOptions::default(),
            mode: None,
        }
    }

    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Permission bits applied to the file on every write
    pub fn with_mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Read the persisted vars without touching the file
    ///
    /// A missing file reads as empty.
    pub fn load(&self) -> Result<Mapping, StateError> {
        if !self.path.exists() {
            return Ok(Mapping::new());
        }
        self.read_existing()
    }

    /// Merge the snapshot into the persisted vars and rewrite the file
    ///
    /// Returns the full mapping that was written.
    #[instrument(skip(self, snapshot), fields(path = %self.path.display()))]
    pub fn materialize(&self, snapshot: &HookSnapshot) -> Result<Mapping, StateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                debug!(dir = %parent.display(), "Creating vars directory");
                fs::create_dir_all(parent)
                    .map_err(|e| StateError::io("create directory", parent, e))?;
            }
        }

        let mut vars = if self.path.exists() {
            self.read_existing()?
        } else {
            fs::File::create(&self.path)
                .map_err(|e| StateError::io("create", &self.path, e))?;
            Mapping::new()
        };

        if let Some(mode) = self.mode {
            set_mode(&self.path, mode)?;
        }

        merge_into(&mut vars, merged_layer(snapshot, &self.options));

        let content = render_vars(&vars)?;
        fs::write(&self.path, content).map_err(|e| StateError::io("write", &self.path, e))?;

        info!(keys = vars.len(), "Wrote vars file");
        Ok(vars)
    }

    fn read_existing(&self) -> Result<Mapping, StateError> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| StateError::io("read", &self.path, e))?;
        parse_vars(&content).map_err(|source| StateError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// Parse vars file content; an empty or null document is an empty mapping
///
/// Non-string scalar keys, at any depth, are read as strings.
pub fn parse_vars(content: &str) -> Result<Mapping, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str(content)? {
        serde_yaml::Value::Null => Ok(Mapping::new()),
        serde_yaml::Value::Mapping(map) => mapping_from_yaml(map),
        _ => Err(serde_yaml::Error::custom("vars file is not a mapping")),
    }
}

/// Render vars as they are written to disk
pub fn render_vars(vars: &Mapping) -> Result<Vec<u8>, StateError> {
    let mut content = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut content, VarsFormatter(PrettyFormatter::new()));
    vars.serialize(&mut serializer)
        .map_err(StateError::Serialize)?;
    content.push(b'\n');
    Ok(content)
}

/// Pretty JSON with floats a YAML 1.1 reader parses as floats
///
/// YAML 1.1 needs a decimal point in every float (`1e20` would be a
/// string), so floats are written in positional notation.
struct VarsFormatter(PrettyFormatter<'static>);

impl Formatter for VarsFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut text = value.to_string();
        if !text.contains('.') {
            text.push_str(".0");
        }
        writer.write_all(text.as_bytes())
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_object_value(writer)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), StateError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| StateError::io("set permissions on", path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, mode: u32) -> Result<(), StateError> {
    tracing::warn!(mode, "File modes are not supported on this platform");
    Ok(())
}
