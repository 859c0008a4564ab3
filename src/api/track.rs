use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ApiError, Result, ValidationSnafu};
use crate::model::{Percentage, TrackEvent, VideoId};
use crate::service::store::Store;

/// Body of `POST /api/track`. Every field is optional here so that missing
/// fields can be reported as a validation error instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl TrackPayload {
    /// Validate the payload into the record it targets and the event to apply.
    pub fn into_event(self) -> Result<(VideoId, TrackEvent)> {
        let (Some(id), Some(kind)) = (self.id, self.kind) else {
            return ValidationSnafu { message: "Missing fields" }.fail();
        };

        let Ok(id) = id.parse::<VideoId>() else {
            return ValidationSnafu { message: "Missing fields" }.fail();
        };

        let event = match kind.as_str() {
            "" => return ValidationSnafu { message: "Missing fields" }.fail(),
            "view" => TrackEvent::View,
            "completion" => {
                let Some(value) = self.value.as_ref().and_then(serde_json::Value::as_f64) else {
                    return ValidationSnafu {
                        message: "Value required for completion",
                    }
                    .fail();
                };

                let Ok(percentage) = Percentage::try_from(value) else {
                    return ValidationSnafu {
                        message: "Completion value must be between 0 and 100",
                    }
                    .fail();
                };

                TrackEvent::Completion(percentage)
            }
            _ => return ValidationSnafu { message: "Invalid type" }.fail(),
        };

        Ok((id, event))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracked {
    pub success: bool,
}

/// Record a playback event.
///
/// The body is read as raw bytes: the player posts JSON without a
/// `Content-Type` header. Events for ids that do not exist are accepted and
/// dropped, since players fire them without waiting for an answer.
#[instrument(skip(store, body))]
pub async fn track(State(store): State<Store>, body: Bytes) -> Result<Json<Tracked>> {
    let payload: TrackPayload = serde_json::from_slice(&body).map_err(|error| {
        tracing::debug!(%error, "unreadable tracking body");
        ValidationSnafu {
            message: "Invalid request body",
        }
        .build()
    })?;

    let (id, event) = payload.into_event()?;

    match store.update(&id, event).await {
        Ok(record) => {
            tracing::info!(%id, event = event.kind(), views = record.views, total_watches = record.total_watches, completion_rate = record.completion_rate, "tracked playback event");
        }
        Err(error) if error.is_not_found() => {
            tracing::debug!(%id, event = event.kind(), "ignoring playback event for unknown video");
        }
        Err(error) => return Err(ApiError::from(error)),
    }

    Ok(Json(Tracked { success: true }))
}
