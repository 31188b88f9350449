//! Shared store doubles for pagedrop-sync integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pagedrop_core::{RemoteFile, VersionToken};
use pagedrop_store::{MemoryStore, RemoteFileStore, StoreError, WriteRequest};
use pagedrop_sync::{RetryPolicy, Sleeper, VersionedWriter};

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    pub delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

#[derive(Default)]
struct Faults {
    /// Path → number of upcoming writes to reject as conflicts (`u32::MAX` = forever).
    conflicts: HashMap<String, u32>,
    /// Path → transport failure for every write.
    transport: HashMap<String, u16>,
    /// Path → edit another writer commits just before our next write lands.
    interlopers: HashMap<String, Box<dyn Fn(&str) -> String + Send>>,
}

/// A [`MemoryStore`] with scripted misbehaviour, recording every write attempt.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    faults: Mutex<Faults>,
    attempts: Mutex<Vec<String>>,
    yield_before_write: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn conflict_times(&self, path: &str, times: u32) {
        self.faults.lock().unwrap().conflicts.insert(path.into(), times);
    }

    pub fn always_conflict(&self, path: &str) {
        self.conflict_times(path, u32::MAX);
    }

    pub fn fail_transport(&self, path: &str, status: u16) {
        self.faults.lock().unwrap().transport.insert(path.into(), status);
    }

    /// Before our next write to `path`, commit `edit(current)` as a rival writer.
    pub fn interlope<F>(&self, path: &str, edit: F)
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        self.faults
            .lock()
            .unwrap()
            .interlopers
            .insert(path.into(), Box::new(edit));
    }

    /// Hand control back to the runtime before every write, so writers
    /// joined on one task interleave between their read and their write.
    pub fn yield_before_writes(&self) {
        self.yield_before_write.store(true, Ordering::SeqCst);
    }

    /// Paths of every write attempt that reached this store, in order.
    pub fn write_attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub async fn seed(&self, path: &str, content: &str) -> VersionToken {
        let current = self.inner.read(path).await.unwrap().token;
        self.inner
            .write(&WriteRequest {
                path,
                content: content.as_bytes(),
                expected: current.as_ref(),
                message: "seed",
            })
            .await
            .unwrap()
    }
}

#[async_trait]
impl RemoteFileStore for FlakyStore {
    async fn read(&self, path: &str) -> Result<RemoteFile, StoreError> {
        self.inner.read(path).await
    }

    async fn write(&self, req: &WriteRequest<'_>) -> Result<VersionToken, StoreError> {
        if self.yield_before_write.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        self.attempts.lock().unwrap().push(req.path.to_string());

        let (transport, conflict, interloper) = {
            let mut faults = self.faults.lock().unwrap();
            let transport = faults.transport.get(req.path).copied();
            let conflict = match faults.conflicts.get_mut(req.path) {
                Some(remaining) if *remaining > 0 => {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    true
                }
                _ => false,
            };
            (transport, conflict, faults.interlopers.remove(req.path))
        };

        if let Some(status) = transport {
            return Err(StoreError::Transport {
                status: Some(status),
                message: "scripted failure".into(),
            });
        }
        if conflict {
            return Err(StoreError::Conflict {
                path: req.path.to_string(),
            });
        }
        if let Some(edit) = interloper {
            let current = self.inner.read(req.path).await?;
            let text = current.text().unwrap_or_default().to_string();
            self.inner
                .write(&WriteRequest {
                    path: req.path,
                    content: edit(&text).as_bytes(),
                    expected: current.token.as_ref(),
                    message: "rival writer",
                })
                .await?;
        }
        self.inner.write(req).await
    }
}

/// Writer over `store` with `max_attempts` and a recording sleeper.
pub fn writer(
    store: Arc<FlakyStore>,
    max_attempts: u32,
) -> (VersionedWriter, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let writer = VersionedWriter::new(store, RetryPolicy::new(max_attempts, Duration::from_millis(100)))
        .with_sleeper(sleeper.clone());
    (writer, sleeper)
}
