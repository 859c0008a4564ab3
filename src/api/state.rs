use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use axum_template::engine::Engine;
use derive_new::new;
use tera::Tera;

use crate::config::Config;
use crate::service::store::Store;

pub type AppEngine = Engine<Tera>;

const TEMPLATES: [(&str, &str); 3] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("watch.html", include_str!("../../templates/watch.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
];

/// Shared state handed to every handler.
#[derive(Clone, new)]
pub struct App {
    pub store: Store,
    pub engine: AppEngine,
    pub uploads: Arc<PathBuf>,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("store", &self.store)
            .field("uploads", &self.uploads)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl FromRef<App> for Store {
    fn from_ref(app: &App) -> Self {
        app.store.clone()
    }
}

impl FromRef<App> for AppEngine {
    fn from_ref(app: &App) -> Self {
        app.engine.clone()
    }
}

/// The page templates, compiled into the binary.
pub fn templates() -> Result<AppEngine, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES)?;
    Ok(Engine::from(tera))
}

pub fn create_app(store: Store, config: &Config) -> Result<App, tera::Error> {
    let engine = templates()?;

    Ok(App::new(
        store,
        engine,
        Arc::new(config.upload_dir.clone()),
        config.max_upload_bytes,
    ))
}
