use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snafu::Snafu;

use crate::service::store::StoreError;
use crate::service::upload::UploadError;
use crate::Located;

/// Errors reported to HTTP clients as `{ "error": message }`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    /// The request itself is wrong; nothing was changed.
    #[snafu(display("{message}"))]
    Validation { message: String },

    #[snafu(display("{what} not found"))]
    NotFound { what: &'static str },

    #[snafu(context(false), display("Internal Server Error"))]
    Storage { source: StoreError },

    #[snafu(context(false), display("Internal Server Error"))]
    Upload { source: UploadError },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Storage { .. } | ApiError::Upload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Storage { source } => {
                tracing::error!(error = %source, location = %source.location(), "storage failure")
            }
            ApiError::Upload { source } => {
                tracing::error!(error = %source, location = %source.location(), "upload failure")
            }
            ApiError::Validation { message } => tracing::debug!(%message, "rejected request"),
            ApiError::NotFound { .. } => {}
        }

        let body = ErrorBody {
            error: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}
