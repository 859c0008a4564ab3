use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_template::RenderHtml;
use serde::Serialize;
use tracing::instrument;

use super::{AppEngine, NotFoundSnafu, Result};
use crate::model::{VideoId, VideoRecord};
use crate::service::store::{Store, StoreError};

/// Look a record up, turning a missing id into `None`.
async fn find(store: &Store, id: &str) -> Result<Option<VideoRecord>, StoreError> {
    let Ok(id) = id.parse::<VideoId>() else {
        return Ok(None);
    };

    match store.get(&id).await {
        Ok(record) => Ok(Some(record)),
        Err(error) if error.is_not_found() => Ok(None),
        Err(error) => Err(error),
    }
}

#[instrument(skip(store))]
pub async fn lookup(State(store): State<Store>, Path(id): Path<String>) -> Result<Json<VideoRecord>> {
    match find(&store, &id).await? {
        Some(record) => Ok(Json(record)),
        None => NotFoundSnafu { what: "Video" }.fail(),
    }
}

#[instrument(skip(store))]
pub async fn list(State(store): State<Store>) -> Result<Json<Vec<VideoRecord>>> {
    Ok(Json(store.list().await?))
}

#[derive(Debug, Serialize)]
struct WatchPage<'a> {
    title: String,
    video_id: &'a VideoId,
    video_url: String,
    /// The page reports its own view on load, so it counts itself in advance.
    views: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    completion: Option<i64>,
}

impl<'a> WatchPage<'a> {
    fn new(record: &'a VideoRecord) -> Self {
        let completion = (record.completion_rate > 0.0).then(|| record.completion_rate.round() as i64);

        WatchPage {
            title: format!("Recording {}", record.created_at.display()),
            video_id: &record.id,
            video_url: record.url(),
            views: record.views.saturating_add(1),
            completion,
        }
    }
}

#[derive(Debug, Serialize)]
struct NotFoundPage {
    id: String,
}

/// The shareable watch page.
#[instrument(skip(store, engine))]
pub async fn watch(
    State(store): State<Store>,
    State(engine): State<AppEngine>,
    Path(id): Path<String>,
) -> Result<Response> {
    let response = match find(&store, &id).await? {
        Some(record) => RenderHtml("watch.html", engine, WatchPage::new(&record)).into_response(),
        None => {
            tracing::debug!(%id, "watch page requested for unknown video");
            (
                StatusCode::NOT_FOUND,
                RenderHtml("not_found.html", engine, NotFoundPage { id }),
            )
                .into_response()
        }
    };

    Ok(response)
}
