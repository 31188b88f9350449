//! Versioned upsert: read token, conditional write, retry on conflict.
//!
//! ## Attempt protocol
//!
//! 1. Read the current state of `path` (missing is fine).
//! 2. Render the desired bytes from the freshly read content.
//! 3. Compare with the stored bytes → skip if identical.
//! 4. Write conditioned on the observed token (no token when absent).
//! 5. On conflict, back off and start again from step 1.
//!
//! Because rendering happens inside every attempt, a retry never overwrites
//! content another writer committed in between with a stale rendition.

use std::sync::Arc;

use pagedrop_core::VersionToken;
use pagedrop_store::{RemoteFileStore, WriteRequest};

use crate::error::{store_err, PublishError};
use crate::retry::{Retried, Retryable, RetryPolicy, Sleeper, TokioSleeper};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual path upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// Content was committed; `token` is the new version.
    Written {
        path: String,
        token: VersionToken,
        attempts: u32,
    },
    /// Stored bytes already matched; nothing was written.
    Unchanged { path: String, token: VersionToken },
    /// Dry-run: the path *would* have been written.
    WouldWrite { path: String },
}

impl WriteResult {
    pub fn path(&self) -> &str {
        match self {
            WriteResult::Written { path, .. }
            | WriteResult::Unchanged { path, .. }
            | WriteResult::WouldWrite { path } => path,
        }
    }

    /// Token now current for the path, if known.
    pub fn token(&self) -> Option<&VersionToken> {
        match self {
            WriteResult::Written { token, .. } | WriteResult::Unchanged { token, .. } => Some(token),
            WriteResult::WouldWrite { .. } => None,
        }
    }
}

enum Applied {
    Written(VersionToken),
    Unchanged(VersionToken),
    WouldWrite,
}

// ---------------------------------------------------------------------------
// VersionedWriter
// ---------------------------------------------------------------------------

/// Store handle plus the retry policy every write goes through.
#[derive(Clone)]
pub struct VersionedWriter {
    store: Arc<dyn RemoteFileStore>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    dry_run: bool,
}

impl VersionedWriter {
    pub fn new(store: Arc<dyn RemoteFileStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            sleeper: Arc::new(TokioSleeper),
            dry_run: false,
        }
    }

    /// Replace the delay source (tests inject one that does not sleep).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Read and compare only; never write.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &dyn RemoteFileStore {
        self.store.as_ref()
    }

    /// Set `path` to exactly `content`.
    pub async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<WriteResult, PublishError> {
        self.upsert_with(path, message, |_| Ok(content.to_vec())).await
    }

    /// Set `path` to whatever `render` derives from its current content.
    ///
    /// `render` is called once per attempt with the bytes just read (`None`
    /// if the path is absent). Errors it returns are terminal unless they are
    /// store conflicts.
    pub async fn upsert_with<F>(
        &self,
        path: &str,
        message: &str,
        render: F,
    ) -> Result<WriteResult, PublishError>
    where
        F: Fn(Option<&[u8]>) -> Result<Vec<u8>, PublishError>,
    {
        let store = self.store.as_ref();
        let render = &render;
        let dry_run = self.dry_run;

        let outcome: Result<Retried<Applied>, PublishError> = self
            .policy
            .run(self.sleeper.as_ref(), path, |_attempt| async move {
                let current = store.read(path).await.map_err(|e| store_err(path, e))?;
                let next = render(current.content.as_deref())?;

                if let (Some(existing), Some(token)) = (current.content.as_deref(), &current.token) {
                    if existing == next.as_slice() {
                        return Ok(Applied::Unchanged(token.clone()));
                    }
                }
                if dry_run {
                    return Ok(Applied::WouldWrite);
                }

                let token = store
                    .write(&WriteRequest {
                        path,
                        content: &next,
                        expected: current.token.as_ref(),
                        message,
                    })
                    .await
                    .map_err(|e| store_err(path, e))?;
                Ok::<_, PublishError>(Applied::Written(token))
            })
            .await;

        match outcome {
            Ok(Retried { value, attempts }) => Ok(match value {
                Applied::Written(token) => {
                    tracing::info!("committed {path} ({token}) after {attempts} attempt(s)");
                    WriteResult::Written {
                        path: path.to_string(),
                        token,
                        attempts,
                    }
                }
                Applied::Unchanged(token) => {
                    tracing::debug!("unchanged: {path}");
                    WriteResult::Unchanged {
                        path: path.to_string(),
                        token,
                    }
                }
                Applied::WouldWrite => {
                    tracing::info!("[dry-run] would write: {path}");
                    WriteResult::WouldWrite {
                        path: path.to_string(),
                    }
                }
            }),
            Err(err) if err.is_conflict() => Err(PublishError::Conflict {
                path: path.to_string(),
                attempts: self.policy.max_attempts(),
            }),
            Err(err) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
