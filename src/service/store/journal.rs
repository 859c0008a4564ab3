use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use snafu::{OptionExt as _, ResultExt as _};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt as _;
use tokio::sync::Mutex;

use super::*;
use crate::model::{now, Percentage, Timestamp};
use crate::service::aggregate;

const JOURNAL: &str = "events.jsonl";

/// One line of the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Entry {
    Created {
        id: VideoId,
        timestamp: Timestamp,
        record: VideoRecord,
    },
    View {
        id: VideoId,
        timestamp: Timestamp,
    },
    Completion {
        id: VideoId,
        timestamp: Timestamp,
        value: Percentage,
    },
}

impl Entry {
    fn tracked(id: &VideoId, event: TrackEvent) -> Self {
        let id = id.clone();
        let timestamp = now();

        match event {
            TrackEvent::View => Entry::View { id, timestamp },
            TrackEvent::Completion(value) => Entry::Completion {
                id,
                timestamp,
                value,
            },
        }
    }

    fn timestamp(&self) -> Timestamp {
        match self {
            Entry::Created { timestamp, .. }
            | Entry::View { timestamp, .. }
            | Entry::Completion { timestamp, .. } => *timestamp,
        }
    }
}

/// Append-only event log folded into in-memory aggregates.
///
/// Appends happen under `writer`, and the in-memory record only changes once
/// its entry is on disk. Readers go straight to the map.
#[derive(Debug, Clone)]
pub struct JournalStore {
    inner: Arc<Journal>,
}

#[derive(Debug)]
struct Journal {
    path: PathBuf,
    records: DashMap<VideoId, Slot>,
    sequence: AtomicU64,
    writer: Mutex<Writer>,
}

#[derive(Debug, Clone)]
struct Slot {
    sequence: u64,
    record: VideoRecord,
}

#[derive(Debug)]
struct Writer {
    file: File,
    len: u64,
}

impl JournalStore {
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(JOURNAL);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(source).context(IoSnafu { path: &path }),
        };

        let (records, valid_len) = replay(&path, &content)?;
        let sequence = records.len() as u64;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context(IoSnafu { path: &path })?;

        if valid_len < content.len() as u64 {
            tracing::warn!(path = %path.display(), dropped = content.len() as u64 - valid_len, "discarding incomplete trailing journal entry");
            file.set_len(valid_len)
                .await
                .context(IoSnafu { path: &path })?;
        }

        tracing::debug!(path = %path.display(), count = records.len(), "replayed journal");

        Ok(JournalStore {
            inner: Arc::new(Journal {
                path,
                records,
                sequence: AtomicU64::new(sequence),
                writer: Mutex::new(Writer {
                    file,
                    len: valid_len,
                }),
            }),
        })
    }

    pub fn get(&self, id: &VideoId) -> Result<VideoRecord> {
        self.inner
            .records
            .get(id)
            .map(|slot| slot.record.clone())
            .context(NotFoundSnafu { id: id.clone() })
    }

    pub fn list(&self) -> Vec<VideoRecord> {
        let mut slots: Vec<Slot> = self
            .inner
            .records
            .iter()
            .map(|slot| slot.value().clone())
            .collect();

        slots.sort_by_key(|slot| slot.sequence);
        slots.into_iter().map(|slot| slot.record).collect()
    }

    pub async fn create(&self, record: VideoRecord) -> Result<VideoRecord> {
        let mut writer = self.inner.writer.lock().await;

        if self.inner.records.contains_key(&record.id) {
            return DuplicateSnafu { id: record.id }.fail();
        }

        let entry = Entry::Created {
            id: record.id.clone(),
            timestamp: record.created_at,
            record: record.clone(),
        };
        self.append(&mut writer, &entry).await?;

        let sequence = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        self.inner.records.insert(
            record.id.clone(),
            Slot {
                sequence,
                record: record.clone(),
            },
        );

        tracing::debug!(id = %record.id, "created record");
        Ok(record)
    }

    pub async fn update(&self, id: &VideoId, event: TrackEvent) -> Result<VideoRecord> {
        let mut writer = self.inner.writer.lock().await;

        let current = self.get(id)?;
        let updated = aggregate::apply(&current, event);

        self.append(&mut writer, &Entry::tracked(id, event)).await?;

        if let Some(mut slot) = self.inner.records.get_mut(id) {
            slot.record = updated.clone();
        }

        tracing::debug!(%id, event = event.kind(), views = updated.views, total_watches = updated.total_watches, "updated record");
        Ok(updated)
    }

    /// Write one entry. On failure the file is cut back to its previous
    /// length so a partial line never reaches the next replay.
    async fn append(&self, writer: &mut Writer, entry: &Entry) -> Result<()> {
        let path = &self.inner.path;

        let mut line = serde_json::to_vec(entry).context(SerializeSnafu { path })?;
        line.push(b'\n');

        let written = async {
            writer.file.write_all(&line).await?;
            writer.file.flush().await
        }
        .await;

        if let Err(source) = written {
            if let Err(error) = writer.file.set_len(writer.len).await {
                tracing::error!(path = %path.display(), %error, "could not roll back partial journal entry");
            }
            return Err(source).context(IoSnafu { path });
        }

        writer.len += line.len() as u64;
        Ok(())
    }
}

/// Fold the journal into records. Returns the records and the byte length of
/// the committed prefix. An unterminated final line was never acknowledged to
/// a caller, so it is dropped; any other malformed line is corruption.
fn replay(path: &Path, content: &str) -> Result<(DashMap<VideoId, Slot>, u64)> {
    let records: DashMap<VideoId, Slot> = DashMap::new();
    let mut sequence = 0;
    let mut valid_len = 0;

    for (index, line) in content.split_inclusive('\n').enumerate() {
        if !line.ends_with('\n') {
            break;
        }

        let text = line.trim();
        if !text.is_empty() {
            let entry: Entry = serde_json::from_str(text).map_err(|error| {
                CorruptSnafu {
                    path,
                    line: index + 1,
                    reason: error.to_string(),
                }
                .build()
            })?;

            fold(&records, &mut sequence, entry, index + 1)?;
        }

        valid_len += line.len() as u64;
    }

    Ok((records, valid_len))
}

fn fold(
    records: &DashMap<VideoId, Slot>,
    sequence: &mut u64,
    entry: Entry,
    line: usize,
) -> Result<()> {
    let timestamp = entry.timestamp();
    let (id, event) = match entry {
        Entry::Created { id, record, .. } => {
            if records.contains_key(&id) {
                tracing::warn!(%id, line, "skipping duplicate create entry");
                return Ok(());
            }

            records.insert(
                id,
                Slot {
                    sequence: *sequence,
                    record,
                },
            );
            *sequence += 1;
            return Ok(());
        }
        Entry::View { id, .. } => (id, TrackEvent::View),
        Entry::Completion { id, value, .. } => (id, TrackEvent::Completion(value)),
    };

    match records.get_mut(&id) {
        Some(mut slot) => {
            let next = aggregate::apply(&slot.record, event);
            slot.record = next;
        }
        None => tracing::warn!(%id, %timestamp, line, event = event.kind(), "skipping entry for unknown video"),
    }

    Ok(())
}
