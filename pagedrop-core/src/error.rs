//! Error types for pagedrop-core.

use std::path::PathBuf;

use thiserror::Error;

/// Input rejected before any store call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The slug normalized to nothing (blank, or only punctuation).
    #[error("slug '{raw}' is empty after normalization")]
    EmptySlug { raw: String },

    /// The section name normalized to nothing.
    #[error("section name '{raw}' is empty after normalization")]
    EmptySection { raw: String },

    /// A required piece of content was absent or blank.
    #[error("missing required content: {0}")]
    MissingContent(&'static str),

    /// A relative file path would escape the slug prefix or is malformed.
    #[error("invalid relative path '{0}'")]
    InvalidPath(String),
}

/// All errors that can arise while resolving store configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required setting was not provided by any source.
    #[error("missing configuration value '{field}' (set {env} or add it to config.yaml)")]
    Missing {
        field: &'static str,
        env: &'static str,
    },

    /// A setting was present but unusable.
    #[error("invalid configuration value '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
