//! The remote store contract.

use async_trait::async_trait;

use pagedrop_core::{RemoteFile, VersionToken};

use crate::error::StoreError;

/// A conditional write.
///
/// With `expected = Some(token)` the store applies the write only if `token`
/// is still current for `path`. With `expected = None` the write is a create
/// and only succeeds if `path` does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub expected: Option<&'a VersionToken>,
    pub message: &'a str,
}

/// Path-addressed store with compare-and-swap writes.
///
/// Every successful write advances the path's token and is recorded as a
/// discrete change carrying `message`.
#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    /// Read `path`. A missing path is `Ok` with [`RemoteFile::exists`] false.
    async fn read(&self, path: &str) -> Result<RemoteFile, StoreError>;

    /// Apply `req`, returning the new token.
    ///
    /// Fails with [`StoreError::Conflict`] if `req.expected` is stale.
    async fn write(&self, req: &WriteRequest<'_>) -> Result<VersionToken, StoreError>;
}

#[async_trait]
impl<S: RemoteFileStore + ?Sized> RemoteFileStore for std::sync::Arc<S> {
    async fn read(&self, path: &str) -> Result<RemoteFile, StoreError> {
        (**self).read(path).await
    }

    async fn write(&self, req: &WriteRequest<'_>) -> Result<VersionToken, StoreError> {
        (**self).write(req).await
    }
}
