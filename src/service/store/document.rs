use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::{OptionExt as _, ResultExt as _};
use tokio::sync::Mutex;

use super::*;
use crate::service::aggregate;

const DOCUMENT: &str = "db.json";

/// Every record in one JSON array, read in full and rewritten in full.
///
/// Writers take `writer` for the whole read-modify-write cycle. The new
/// document is written next to the old one and renamed over it, so readers
/// never need the lock and a failed write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    inner: Arc<Document>,
}

#[derive(Debug)]
struct Document {
    path: PathBuf,
    scratch: PathBuf,
    writer: Mutex<()>,
}

impl DocumentStore {
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(DOCUMENT);
        let scratch = dir.join(format!("{DOCUMENT}.tmp"));

        let exists = tokio::fs::try_exists(&path)
            .await
            .context(IoSnafu { path: &path })?;

        if !exists {
            tracing::info!(path = %path.display(), "creating empty record document");
            tokio::fs::write(&path, "[]")
                .await
                .context(IoSnafu { path: &path })?;
        }

        let store = DocumentStore {
            inner: Arc::new(Document {
                path,
                scratch,
                writer: Mutex::new(()),
            }),
        };

        // fail fast on a document we cannot parse
        let records = store.read().await?;
        tracing::debug!(count = records.len(), "loaded record document");

        Ok(store)
    }

    pub async fn get(&self, id: &VideoId) -> Result<VideoRecord> {
        self.read()
            .await?
            .into_iter()
            .find(|record| &record.id == id)
            .context(NotFoundSnafu { id: id.clone() })
    }

    pub async fn list(&self) -> Result<Vec<VideoRecord>> {
        self.read().await
    }

    pub async fn create(&self, record: VideoRecord) -> Result<VideoRecord> {
        let _guard = self.inner.writer.lock().await;

        let mut records = self.read().await?;
        if records.iter().any(|existing| existing.id == record.id) {
            return DuplicateSnafu { id: record.id }.fail();
        }

        records.push(record.clone());
        self.write(&records).await?;

        tracing::debug!(id = %record.id, "created record");
        Ok(record)
    }

    pub async fn update(&self, id: &VideoId, event: TrackEvent) -> Result<VideoRecord> {
        let _guard = self.inner.writer.lock().await;

        let mut records = self.read().await?;
        let record = records
            .iter_mut()
            .find(|record| &record.id == id)
            .context(NotFoundSnafu { id: id.clone() })?;

        *record = aggregate::apply(record, event);
        let updated = record.clone();

        self.write(&records).await?;

        tracing::debug!(%id, event = event.kind(), views = updated.views, total_watches = updated.total_watches, "updated record");
        Ok(updated)
    }

    async fn read(&self) -> Result<Vec<VideoRecord>> {
        let path = &self.inner.path;
        let bytes = tokio::fs::read(path).await.context(IoSnafu { path })?;
        serde_json::from_slice(&bytes).context(DeserializeSnafu { path })
    }

    async fn write(&self, records: &[VideoRecord]) -> Result<()> {
        let Document { path, scratch, .. } = self.inner.as_ref();

        let json = serde_json::to_vec_pretty(records).context(SerializeSnafu { path })?;
        tokio::fs::write(scratch, json)
            .await
            .context(IoSnafu { path: scratch })?;
        tokio::fs::rename(scratch, path)
            .await
            .context(IoSnafu { path })?;

        Ok(())
    }
}
