use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

mod error;
mod state;

pub mod track;
pub mod upload;
pub mod video;

pub use error::*;
pub use state::*;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Every route the server answers.
pub fn create_router(app: App) -> Router {
    let uploads = ServeDir::new(app.uploads.as_path());
    let upload_limit = DefaultBodyLimit::max(app.max_upload_bytes);

    Router::new()
        .route("/api/track", post(track::track))
        .route("/track", post(track::track))
        .route("/api/upload", post(upload::upload).layer(upload_limit))
        .route("/api/videos", get(video::list))
        .route("/api/videos/:id", get(video::lookup))
        .route("/watch/:id", get(video::watch))
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}
