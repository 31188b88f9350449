//! # pagedrop-sync
//!
//! Publishing and patching files in a versioned remote store.
//!
//! - [`VersionedWriter`] performs one read-token / conditional-write upsert,
//!   retrying lost races under a [`RetryPolicy`].
//! - [`BatchPublisher`] applies a whole [`pagedrop_core::PublishUnit`]
//!   sequentially with explicit partial-failure reporting.
//! - [`SectionPatcher`] replaces the interior of one marker-delimited section
//!   of a published document.

pub mod batch;
pub mod diff;
pub mod error;
pub mod retry;
pub mod section;
pub mod site;
pub mod writer;

pub use batch::{BatchPublisher, PublishReport};
pub use diff::FileDiff;
pub use error::{BatchFailure, ErrorKind, PublishError};
pub use retry::{Retried, Retryable, RetryPolicy, Sleeper, Step, TokioSleeper};
pub use section::{splice_section, SectionPatcher};
pub use site::{build_unit, SiteRequest};
pub use writer::{VersionedWriter, WriteResult};
