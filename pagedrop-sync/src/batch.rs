//! Sequential publication of one [`PublishUnit`].
//!
//! Files are taken from an explicit FIFO queue one at a time; file *i* has
//! finished (including its own retries) before file *i + 1* is read. The
//! batch is not transactional: a failure leaves earlier files committed and
//! later ones untouched, and the error says exactly where it stopped.

use std::collections::VecDeque;

use tokio::time::Instant;

use pagedrop_core::{FileEntry, PublishUnit, Slug};

use crate::error::{BatchFailure, PublishError};
use crate::writer::{VersionedWriter, WriteResult};

/// Outcome of a fully applied publish unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub slug: Slug,
    pub writes: Vec<WriteResult>,
}

impl PublishReport {
    /// Every path in the unit, in write order.
    pub fn paths(&self) -> Vec<&str> {
        self.writes.iter().map(WriteResult::path).collect()
    }

    /// Files actually committed.
    pub fn written(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, WriteResult::Written { .. }))
            .count()
    }

    /// Files a dry run found out of date.
    pub fn would_write(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, WriteResult::WouldWrite { .. }))
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, WriteResult::Unchanged { .. }))
            .count()
    }
}

/// Commit message for one file of a publish unit.
pub fn publish_message(slug: &Slug, relative_path: &str) -> String {
    format!("Publish {slug}: {relative_path}")
}

/// Applies publish units through a [`VersionedWriter`].
#[derive(Clone)]
pub struct BatchPublisher {
    writer: VersionedWriter,
    deadline: Option<Instant>,
}

impl BatchPublisher {
    pub fn new(writer: VersionedWriter) -> Self {
        Self {
            writer,
            deadline: None,
        }
    }

    /// Stop before starting a file once `deadline` has passed.
    ///
    /// A write already in flight is allowed to finish.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Write every file of `unit` under `{slug}/`, in order.
    pub async fn publish(&self, unit: PublishUnit) -> Result<PublishReport, PublishError> {
        let (slug, files) = unit.into_files();
        let mut queue: VecDeque<(usize, FileEntry)> = files.into_iter().enumerate().collect();
        let mut writes = Vec::with_capacity(queue.len());

        tracing::info!("publishing {slug}: {} file(s)", queue.len());

        while let Some((index, entry)) = queue.pop_front() {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    tracing::warn!(
                        "deadline reached publishing {slug}; {} file(s) not attempted",
                        queue.len() + 1
                    );
                    return Err(PublishError::DeadlineExceeded {
                        slug,
                        committed: writes,
                        remaining: queue.len() + 1,
                    });
                }
            }

            let path = match slug.join(&entry.relative_path) {
                Ok(path) => path,
                Err(e) => {
                    return Err(fail(slug, index, entry.relative_path, writes, e.into()));
                }
            };
            let message = publish_message(&slug, &entry.relative_path);

            match self.writer.put(&path, &entry.content, &message).await {
                Ok(result) => writes.push(result),
                Err(source) => {
                    tracing::warn!(
                        "publishing {slug} stopped at {path} ({} committed): {source}",
                        writes.len()
                    );
                    return Err(fail(slug, index, path, writes, source));
                }
            }
        }

        Ok(PublishReport { slug, writes })
    }
}

fn fail(
    slug: Slug,
    index: usize,
    path: String,
    committed: Vec<WriteResult>,
    source: PublishError,
) -> PublishError {
    PublishError::Batch(Box::new(BatchFailure {
        slug,
        index,
        path,
        committed,
        source,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use pagedrop_core::normalize_slug;
    use pagedrop_store::MemoryStore;

    use crate::retry::RetryPolicy;

    fn publisher(store: Arc<MemoryStore>) -> BatchPublisher {
        BatchPublisher::new(VersionedWriter::new(store, RetryPolicy::new(2, Duration::ZERO)))
    }

    fn unit(files: &[(&str, &str)]) -> PublishUnit {
        let mut unit = PublishUnit::new(normalize_slug("Mon Café!").unwrap());
        for (path, body) in files {
            unit.push(*path, *body).unwrap();
        }
        unit
    }

    #[tokio::test]
    async fn writes_every_file_under_slug_in_order() {
        let store = Arc::new(MemoryStore::new());
        let report = publisher(store.clone())
            .publish(unit(&[("index.html", "<h1>hi</h1>"), ("styles/main.css", "h1{}")]))
            .await
            .unwrap();

        assert_eq!(report.slug.as_str(), "mon-cafe");
        assert_eq!(report.paths(), vec!["mon-cafe/index.html", "mon-cafe/styles/main.css"]);
        assert_eq!(report.written(), 2);

        let order: Vec<_> = store.commits().into_iter().map(|c| c.path).collect();
        assert_eq!(order, vec!["mon-cafe/index.html", "mon-cafe/styles/main.css"]);
    }

    #[tokio::test]
    async fn commit_messages_name_slug_and_file() {
        let store = Arc::new(MemoryStore::new());
        publisher(store.clone())
            .publish(unit(&[("index.html", "x")]))
            .await
            .unwrap();
        assert_eq!(store.commits()[0].message, "Publish mon-cafe: index.html");
    }

    #[tokio::test]
    async fn republishing_same_content_reports_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let p = publisher(store.clone());
        p.publish(unit(&[("index.html", "x")])).await.unwrap();
        let report = p.publish(unit(&[("index.html", "x")])).await.unwrap();

        assert_eq!(report.unchanged(), 1);
        assert_eq!(report.written(), 0);
        assert_eq!(store.commits().len(), 1);
    }

    #[tokio::test]
    async fn dry_run_counts_nothing_as_written() {
        let store = Arc::new(MemoryStore::new());
        let p = publisher(store.clone());
        p.publish(unit(&[("index.html", "x")])).await.unwrap();

        let dry = BatchPublisher::new(p.writer.clone().dry_run(true));
        let report = dry
            .publish(unit(&[("index.html", "x"), ("README.txt", "y")]))
            .await
            .unwrap();

        assert_eq!(report.written(), 0);
        assert_eq!(report.would_write(), 1);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(store.commits().len(), 1);
    }

    #[tokio::test]
    async fn empty_unit_is_a_successful_no_op() {
        let store = Arc::new(MemoryStore::new());
        let report = publisher(store.clone()).publish(unit(&[])).await.unwrap();
        assert!(report.writes.is_empty());
        assert!(store.commits().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_attempts_nothing() {
        let store = Arc::new(MemoryStore::new());
        let deadline = Instant::now();
        tokio::time::advance(Duration::from_millis(1)).await;

        let err = publisher(store.clone())
            .deadline(deadline)
            .publish(unit(&[("index.html", "x"), ("README.txt", "y")]))
            .await
            .unwrap_err();

        match err {
            PublishError::DeadlineExceeded {
                committed,
                remaining,
                ..
            } => {
                assert!(committed.is_empty());
                assert_eq!(remaining, 2);
            }
            other => panic!("unexpected: {other}"),
        }
        assert!(store.commits().is_empty());
    }
}
