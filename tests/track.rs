use std::future::IntoFuture;

use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::{json, Value};

use screenshare::model::VideoId;
use screenshare::service::store::StoreKind;

mod common;

use common::{Harness, BACKENDS};

#[tokio::test]
async fn view_increments_views() {
    for kind in BACKENDS {
        let harness = Harness::new(kind).await;
        let record = harness.seed().await;

        let response = harness
            .server
            .post("/api/track")
            .json(&json!({ "id": record.id, "type": "view" }))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));

        let stored = harness.store.get(&record.id).await.unwrap();
        assert_eq!(stored.views, 1);
        assert_eq!(stored.total_watches, 0);
    }
}

#[tokio::test]
async fn completions_build_the_weighted_average() {
    for kind in BACKENDS {
        let harness = Harness::new(kind).await;
        let record = harness.seed().await;

        for value in [80, 40] {
            harness
                .server
                .post("/api/track")
                .json(&json!({ "id": record.id, "type": "completion", "value": value }))
                .await
                .assert_status_ok();
        }

        let stored = harness.store.get(&record.id).await.unwrap();
        assert_eq!(stored.total_watches, 2);
        assert_eq!(stored.completion_rate, 60.0);
        assert_eq!(stored.views, 0);
    }
}

#[tokio::test]
async fn body_without_content_type_is_accepted() {
    let harness = Harness::new(common::BACKENDS[0]).await;
    let record = harness.seed().await;

    let body = json!({ "id": record.id, "type": "view" }).to_string();
    harness
        .server
        .post("/track")
        .bytes(body.into())
        .await
        .assert_status_ok();

    assert_eq!(harness.store.get(&record.id).await.unwrap().views, 1);
}

#[tokio::test]
async fn missing_id_is_rejected_without_changes() {
    let harness = Harness::new(common::BACKENDS[0]).await;
    let record = harness.seed().await;

    let response = harness
        .server
        .post("/api/track")
        .json(&json!({ "type": "view" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Missing fields" }));
    assert_eq!(harness.store.get(&record.id).await.unwrap(), record);
}

#[tokio::test]
async fn non_numeric_completion_is_rejected_without_changes() {
    for kind in BACKENDS {
        let harness = Harness::new(kind).await;
        let record = harness.seed().await;

        let response = harness
            .server
            .post("/api/track")
            .json(&json!({ "id": record.id, "type": "completion", "value": "most of it" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "Value required for completion" }));
        assert_eq!(harness.store.get(&record.id).await.unwrap(), record);
    }
}

#[tokio::test]
async fn out_of_range_completion_is_rejected() {
    let harness = Harness::new(common::BACKENDS[0]).await;
    let record = harness.seed().await;

    let response = harness
        .server
        .post("/api/track")
        .json(&json!({ "id": record.id, "type": "completion", "value": 140 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Completion value must be between 0 and 100" }));
    assert_eq!(harness.store.get(&record.id).await.unwrap(), record);
}

#[tokio::test]
async fn unknown_type_and_garbage_are_rejected() {
    let harness = Harness::new(common::BACKENDS[0]).await;
    let record = harness.seed().await;

    let response = harness
        .server
        .post("/api/track")
        .json(&json!({ "id": record.id, "type": "rewind" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Invalid type" }));

    let response = harness
        .server
        .post("/api/track")
        .bytes("not json at all".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Invalid request body" }));

    assert_eq!(harness.store.get(&record.id).await.unwrap(), record);
}

#[tokio::test]
async fn unknown_id_is_a_silent_no_op() {
    for kind in BACKENDS {
        let harness = Harness::new(kind).await;
        let record = harness.seed().await;
        let before = harness.store.list().await.unwrap();

        let response = harness
            .server
            .post("/api/track")
            .json(&json!({ "id": VideoId::generate(), "type": "completion", "value": 50 }))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));
        assert_eq!(harness.store.list().await.unwrap(), before);
        assert_eq!(harness.store.get(&record.id).await.unwrap(), record);
    }
}

#[tokio::test]
async fn storage_failure_is_an_internal_error_and_commits_nothing() {
    let harness = Harness::new(StoreKind::Document).await;
    let record = harness.seed().await;

    // the scratch file can no longer be written, so the rewrite fails
    std::fs::create_dir(harness.data.path().join("db.json.tmp")).unwrap();

    let response = harness
        .server
        .post("/api/track")
        .json(&json!({ "id": record.id, "type": "view" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({ "error": "Internal Server Error" }));
    assert_eq!(harness.store.get(&record.id).await.unwrap(), record);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_concurrent_views_are_all_counted() {
    for kind in BACKENDS {
        let harness = Harness::new(kind).await;
        let record = harness.seed().await;

        let requests = (0..50).map(|_| {
            harness
                .server
                .post("/api/track")
                .json(&json!({ "id": record.id, "type": "view" }))
                .into_future()
        });

        for response in join_all(requests).await {
            response.assert_status_ok();
        }

        assert_eq!(harness.store.get(&record.id).await.unwrap().views, 50);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completions_keep_an_exact_count() {
    let harness = Harness::new(common::BACKENDS[1]).await;
    let record = harness.seed().await;

    let requests = (0..40).map(|n| {
        let value = if n % 2 == 0 { 100 } else { 50 };
        harness
            .server
            .post("/api/track")
            .json(&json!({ "id": record.id, "type": "completion", "value": value }))
            .into_future()
    });

    for response in join_all(requests).await {
        response.assert_status_ok();
    }

    let stored = harness.store.get(&record.id).await.unwrap();
    assert_eq!(stored.total_watches, 40);
    assert!((stored.completion_rate - 75.0).abs() < 1e-9);

    let listed: Value = harness.server.get("/api/videos").await.json();
    assert_eq!(listed[0]["totalWatches"], 40);
}
