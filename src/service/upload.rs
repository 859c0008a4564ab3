use std::path::{Path, PathBuf};

use snafu::{Location, ResultExt as _, Snafu};
use tracing::instrument;

use crate::model::{VideoId, VideoRecord};
use crate::service::store::{Store, StoreError};
use crate::Located;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum UploadError {
    #[snafu(display("could not write the uploaded file to `{}`: {source}", path.display()))]
    WriteBlob {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not create a record for `{id}`: {source}"))]
    CreateRecord {
        id: VideoId,
        source: StoreError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for UploadError {
    fn location(&self) -> Location {
        match self {
            UploadError::WriteBlob { location, .. } | UploadError::CreateRecord { location, .. } => {
                *location
            }
        }
    }
}

/// Store an uploaded recording under a fresh id and register it.
///
/// The blob is written first; if the record cannot be created afterwards the
/// blob is removed again so no orphaned file is left behind.
#[instrument(skip(store, blob), fields(size = blob.len()))]
pub async fn save(store: &Store, dir: &Path, blob: &[u8]) -> Result<VideoRecord, UploadError> {
    let id = VideoId::generate();
    let filename = format!("{id}.webm");
    let path = dir.join(&filename);

    tokio::fs::create_dir_all(dir)
        .await
        .context(WriteBlobSnafu { path: dir })?;

    tokio::fs::write(&path, blob)
        .await
        .context(WriteBlobSnafu { path: &path })?;

    let record = VideoRecord::new(id.clone(), filename);

    match store.create(record).await {
        Ok(record) => {
            tracing::info!(%id, path = %path.display(), "stored new recording");
            Ok(record)
        }
        Err(source) => {
            if let Err(error) = tokio::fs::remove_file(&path).await {
                tracing::warn!(%id, %error, "could not remove blob of failed upload");
            }
            Err(source).context(CreateRecordSnafu { id })
        }
    }
}
