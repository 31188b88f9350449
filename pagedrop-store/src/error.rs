//! Error types for pagedrop-store.

use thiserror::Error;

/// All errors a store read or write can produce.
///
/// A missing file is not an error; see [`pagedrop_core::RemoteFile::exists`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The supplied version token no longer matches the stored one, or a
    /// tokenless create hit an existing path.
    #[error("version conflict writing {path}")]
    Conflict { path: String },

    /// Network, auth, or service failure unrelated to versioning.
    #[error("transport error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The store answered but the payload could not be understood.
    #[error("could not decode {path}: {message}")]
    Decode { path: String, message: String },

    /// The client could not be constructed from the given configuration.
    #[error("store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub(crate) fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        StoreError::Transport {
            status,
            message: message.into(),
        }
    }
}
