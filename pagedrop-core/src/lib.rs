//! # pagedrop-core
//!
//! Domain types, identifier normalization, and store configuration shared by
//! the store client, the publisher, and the CLI.

pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

pub use config::{RetrySettings, Secret, StoreConfig};
pub use error::{ConfigError, ValidationError};
pub use normalize::{normalize_section, normalize_slug};
pub use types::{FileEntry, PublishUnit, RemoteFile, SectionName, Slug, VersionToken};
