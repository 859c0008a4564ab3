use std::path::{Path, PathBuf};

use serde::Deserialize;
use snafu::{Location, ResultExt as _, Snafu};
use tracing::instrument;

use crate::model::{TrackEvent, VideoId, VideoRecord};
use crate::Located;

pub use document::DocumentStore;
pub use journal::JournalStore;

mod document;
mod journal;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("video `{id}` does not exist"))]
    NotFound {
        id: VideoId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("video `{id}` already exists"))]
    Duplicate {
        id: VideoId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to access `{}`: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to encode records for `{}`: {source}", path.display()))]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to decode records from `{}`: {source}", path.display()))]
    Deserialize {
        path: PathBuf,
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{}` is corrupted at line {line}: {reason}", path.display()))]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("store task did not complete: {source}"))]
    Task {
        source: tokio::task::JoinError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl Located for StoreError {
    fn location(&self) -> Location {
        match self {
            StoreError::NotFound { location, .. }
            | StoreError::Duplicate { location, .. }
            | StoreError::Io { location, .. }
            | StoreError::Serialize { location, .. }
            | StoreError::Deserialize { location, .. }
            | StoreError::Corrupt { location, .. }
            | StoreError::Task { location, .. } => *location,
        }
    }
}

/// Which persistence layout backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// One JSON document, rewritten on every change.
    #[default]
    Document,
    /// Append-only event log replayed into memory on open.
    Journal,
}

/// The record store shared by every request handler.
///
/// Every mutation is serialized by the backend's single writer lock, so two
/// concurrent updates can never both read the same old state. Mutations also
/// run on their own task: a caller that goes away mid-request does not leave
/// a half-applied change behind.
#[derive(Debug, Clone)]
pub enum Store {
    Document(DocumentStore),
    Journal(JournalStore),
}

impl Store {
    #[instrument]
    pub async fn open(kind: StoreKind, dir: &Path) -> Result<Store> {
        tokio::fs::create_dir_all(dir)
            .await
            .context(IoSnafu { path: dir })?;

        let store = match kind {
            StoreKind::Document => Store::Document(DocumentStore::open(dir).await?),
            StoreKind::Journal => Store::Journal(JournalStore::open(dir).await?),
        };

        tracing::info!(?kind, dir = %dir.display(), "opened record store");
        Ok(store)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &VideoId) -> Result<VideoRecord> {
        match self {
            Store::Document(store) => store.get(id).await,
            Store::Journal(store) => store.get(id),
        }
    }

    /// All records, oldest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<VideoRecord>> {
        match self {
            Store::Document(store) => store.list().await,
            Store::Journal(store) => Ok(store.list()),
        }
    }

    #[instrument(skip(self), fields(id = %record.id))]
    pub async fn create(&self, record: VideoRecord) -> Result<VideoRecord> {
        let store = self.clone();

        tokio::spawn(async move {
            match &store {
                Store::Document(store) => store.create(record).await,
                Store::Journal(store) => store.create(record).await,
            }
        })
        .await
        .context(TaskSnafu)?
    }

    /// Apply `event` to the record `id` as one read-modify-write transaction and
    /// return the record as persisted.
    #[instrument(skip(self))]
    pub async fn update(&self, id: &VideoId, event: TrackEvent) -> Result<VideoRecord> {
        let store = self.clone();
        let id = id.clone();

        tokio::spawn(async move {
            match &store {
                Store::Document(store) => store.update(&id, event).await,
                Store::Journal(store) => store.update(&id, event).await,
            }
        })
        .await
        .context(TaskSnafu)?
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::join_all;
    use futures::FutureExt as _;

    use super::*;
    use crate::model::Percentage;

    async fn stores() -> Vec<(tempfile::TempDir, Store)> {
        let mut stores = Vec::new();
        for kind in [StoreKind::Document, StoreKind::Journal] {
            let dir = tempfile::tempdir().unwrap();
            let store = Store::open(kind, dir.path()).await.unwrap();
            stores.push((dir, store));
        }
        stores
    }

    fn clip() -> VideoRecord {
        let id = VideoId::generate();
        let filename = format!("{id}.webm");
        VideoRecord::new(id, filename)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        for (_dir, store) in stores().await {
            let record = clip();
            store.create(record.clone()).await.unwrap();

            let found = store.get(&record.id).await.unwrap();
            assert_eq!(found, record);
        }
    }

    #[tokio::test]
    async fn missing_ids_are_reported() {
        for (_dir, store) in stores().await {
            let id = VideoId::generate();

            assert!(store.get(&id).await.unwrap_err().is_not_found());
            assert!(store
                .update(&id, TrackEvent::View)
                .await
                .unwrap_err()
                .is_not_found());
            assert!(store.list().await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        for (_dir, store) in stores().await {
            let record = clip();
            store.create(record.clone()).await.unwrap();

            let error = store.create(record.clone()).await.unwrap_err();
            assert!(matches!(error, StoreError::Duplicate { .. }));
            assert_eq!(store.list().await.unwrap(), vec![record]);
        }
    }

    #[tokio::test]
    async fn updates_are_persisted() {
        for (_dir, store) in stores().await {
            let record = clip();
            store.create(record.clone()).await.unwrap();

            let eighty = Percentage::try_from(80.0).unwrap();
            let forty = Percentage::try_from(40.0).unwrap();
            store.update(&record.id, TrackEvent::Completion(eighty)).await.unwrap();
            store.update(&record.id, TrackEvent::Completion(forty)).await.unwrap();
            let returned = store.update(&record.id, TrackEvent::View).await.unwrap();

            let found = store.get(&record.id).await.unwrap();
            assert_eq!(found, returned);
            assert_eq!(found.views, 1);
            assert_eq!(found.total_watches, 2);
            assert_eq!(found.completion_rate, 60.0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_views_are_not_lost() {
        for (_dir, store) in stores().await {
            let record = clip();
            let other = clip();
            store.create(record.clone()).await.unwrap();
            store.create(other.clone()).await.unwrap();

            let tasks = (0..50).map(|n| {
                let store = store.clone();
                let id = if n % 5 == 0 { other.id.clone() } else { record.id.clone() };
                tokio::spawn(async move { store.update(&id, TrackEvent::View).await })
            });

            for result in join_all(tasks).await {
                result.unwrap().unwrap();
            }

            assert_eq!(store.get(&record.id).await.unwrap().views, 40);
            assert_eq!(store.get(&other.id).await.unwrap().views, 10);
        }
    }

    #[tokio::test]
    async fn dropped_update_still_commits() {
        for (_dir, store) in stores().await {
            let record = clip();
            store.create(record.clone()).await.unwrap();

            // poll once so the mutation is handed off, then abandon it
            let abandoned = store
                .update(&record.id, TrackEvent::View)
                .now_or_never();
            assert!(abandoned.is_none());

            let mut views = 0;
            for _ in 0..200 {
                views = store.get(&record.id).await.unwrap().views;
                if views == 1 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            assert_eq!(views, 1);
        }
    }

    #[tokio::test]
    async fn list_keeps_creation_order() {
        for (_dir, store) in stores().await {
            let first = clip();
            let second = clip();
            store.create(first.clone()).await.unwrap();
            store.create(second.clone()).await.unwrap();

            let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![first.id, second.id]);
        }
    }
}
