//! Errors raised while materializing the vars file.

use std::path::PathBuf;

use thiserror::Error;

/// Vars file errors
///
/// Neither kind is recoverable within a single invocation. A parse error
/// means the existing file was left exactly as found.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Existing vars file is corrupt: {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize vars: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl StateError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Whether the error came from unreadable existing state
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
