use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{App, Result, ValidationSnafu};
use crate::model::VideoId;
use crate::service::upload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uploaded {
    pub id: VideoId,
    pub url: String,
}

/// Accept a recording as the `file` field of a multipart form.
#[instrument(skip(app, multipart))]
pub async fn upload(State(app): State<App>, mut multipart: Multipart) -> Result<Json<Uploaded>> {
    let mut blob = None;

    loop {
        let field = multipart.next_field().await.map_err(|error| {
            tracing::debug!(%error, "unreadable multipart body");
            ValidationSnafu {
                message: "Invalid upload body",
            }
            .build()
        })?;

        let Some(field) = field else { break };
        if field.name() != Some("file") {
            continue;
        }

        let bytes = field.bytes().await.map_err(|error| {
            tracing::debug!(%error, "could not read uploaded file");
            ValidationSnafu {
                message: "Invalid upload body",
            }
            .build()
        })?;

        blob = Some(bytes);
        break;
    }

    let Some(blob) = blob else {
        return ValidationSnafu {
            message: "No file uploaded",
        }
        .fail();
    };

    let record = upload::save(&app.store, &app.uploads, &blob).await?;

    Ok(Json(Uploaded {
        url: record.url(),
        id: record.id,
    }))
}
