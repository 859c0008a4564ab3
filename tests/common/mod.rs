#![allow(dead_code)]

use axum_test::TestServer;
use tempfile::TempDir;

use screenshare::api;
use screenshare::config::Config;
use screenshare::model::{VideoId, VideoRecord};
use screenshare::service::store::{Store, StoreKind};

pub struct Harness {
    pub server: TestServer,
    pub store: Store,
    pub uploads: TempDir,
    pub data: TempDir,
}

impl Harness {
    pub async fn new(kind: StoreKind) -> Harness {
        let data = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();

        let config = Config::from_vars(vec![
            ("DATA_DIR".to_string(), data.path().display().to_string()),
            ("UPLOAD_DIR".to_string(), uploads.path().display().to_string()),
            ("MAX_UPLOAD_BYTES".to_string(), "4096".to_string()),
        ])
        .unwrap();

        let store = Store::open(kind, &config.data_dir).await.unwrap();
        let app = api::create_app(store.clone(), &config).unwrap();
        let server = TestServer::new(api::create_router(app)).unwrap();

        Harness {
            server,
            store,
            uploads,
            data,
        }
    }

    /// Register a recording directly in the store.
    pub async fn seed(&self) -> VideoRecord {
        let id = VideoId::generate();
        let filename = format!("{id}.webm");
        self.store
            .create(VideoRecord::new(id, filename))
            .await
            .unwrap()
    }
}

pub const BACKENDS: [StoreKind; 2] = [StoreKind::Document, StoreKind::Journal];
