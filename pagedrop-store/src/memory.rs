//! In-process [`RemoteFileStore`] with the same compare-and-swap rules as the
//! remote API. Used by tests and by offline runs of the CLI.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use pagedrop_core::{RemoteFile, VersionToken};

use crate::error::StoreError;
use crate::store::{RemoteFileStore, WriteRequest};

/// One accepted write, in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub path: String,
    pub message: String,
    pub token: VersionToken,
    pub committed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<String, (Vec<u8>, VersionToken)>,
    commits: Vec<CommitRecord>,
    generation: u64,
}

/// A versioned store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every accepted write so far, oldest first.
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.lock().commits.clone()
    }

    /// Current content of `path`, bypassing the async API.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).map(|(content, _)| content.clone())
    }

    /// Sorted list of stored paths.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().files.keys().cloned().collect();
        paths.sort();
        paths
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn next_token(generation: u64, content: &[u8]) -> VersionToken {
    let mut h = Sha256::new();
    h.update(generation.to_be_bytes());
    h.update(content);
    let digest = hex::encode(h.finalize());
    VersionToken(digest[..16].to_string())
}

#[async_trait]
impl RemoteFileStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<RemoteFile, StoreError> {
        let inner = self.lock();
        Ok(match inner.files.get(path) {
            Some((content, token)) => RemoteFile::present(path, content.clone(), token.clone()),
            None => RemoteFile::missing(path),
        })
    }

    async fn write(&self, req: &WriteRequest<'_>) -> Result<VersionToken, StoreError> {
        let mut inner = self.lock();
        let current = inner.files.get(req.path).map(|(_, token)| token);
        if current != req.expected {
            tracing::debug!(
                "memory store rejected write to {}: expected {:?}, current {:?}",
                req.path,
                req.expected,
                current
            );
            return Err(StoreError::Conflict {
                path: req.path.to_string(),
            });
        }

        inner.generation += 1;
        let token = next_token(inner.generation, req.content);
        inner
            .files
            .insert(req.path.to_string(), (req.content.to_vec(), token.clone()));
        inner.commits.push(CommitRecord {
            path: req.path.to_string(),
            message: req.message.to_string(),
            token: token.clone(),
            committed_at: Utc::now(),
        });
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req<'a>(
        path: &'a str,
        content: &'a [u8],
        expected: Option<&'a VersionToken>,
    ) -> WriteRequest<'a> {
        WriteRequest {
            path,
            content,
            expected,
            message: "test",
        }
    }

    #[tokio::test]
    async fn missing_path_reads_as_absent() {
        let store = MemoryStore::new();
        let file = store.read("site/index.html").await.unwrap();
        assert!(!file.exists());
        assert!(file.content.is_none());
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let store = MemoryStore::new();
        let token = store.write(&req("a/index.html", b"v1", None)).await.unwrap();

        let file = store.read("a/index.html").await.unwrap();
        assert_eq!(file.content.as_deref(), Some(&b"v1"[..]));
        assert_eq!(file.token, Some(token));
    }

    #[tokio::test]
    async fn tokenless_write_over_existing_file_conflicts() {
        let store = MemoryStore::new();
        store.write(&req("a", b"v1", None)).await.unwrap();
        let err = store.write(&req("a", b"v2", None)).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get("a").as_deref(), Some(&b"v1"[..]));
    }

    #[tokio::test]
    async fn token_for_missing_path_conflicts() {
        let store = MemoryStore::new();
        let stale = VersionToken::from("deadbeef");
        let err = store.write(&req("a", b"v1", Some(&stale))).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn identical_content_still_advances_token() {
        let store = MemoryStore::new();
        let t1 = store.write(&req("a", b"same", None)).await.unwrap();
        let t2 = store.write(&req("a", b"same", Some(&t1))).await.unwrap();
        assert_ne!(t1, t2);
    }

    #[tokio::test]
    async fn every_write_is_recorded_with_its_message() {
        let store = MemoryStore::new();
        let t1 = store
            .write(&WriteRequest {
                path: "a",
                content: b"1",
                expected: None,
                message: "first",
            })
            .await
            .unwrap();
        store
            .write(&WriteRequest {
                path: "a",
                content: b"2",
                expected: Some(&t1),
                message: "second",
            })
            .await
            .unwrap();

        let messages: Vec<_> = store.commits().into_iter().map(|c| c.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
