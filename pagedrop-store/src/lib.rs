//! # pagedrop-store
//!
//! Path-addressed, versioned remote file storage.
//!
//! [`RemoteFileStore`] is the seam the publisher talks to. Two
//! implementations ship here: [`GitHubContentsStore`] for a Git-hosting
//! contents API and [`MemoryStore`] for tests and offline runs. Both enforce
//! the same compare-and-swap rule on the version token.

pub mod error;
pub mod github;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use github::GitHubContentsStore;
pub use memory::{CommitRecord, MemoryStore};
pub use store::{RemoteFileStore, WriteRequest};
