// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Error mapping at the HTTP boundary: 500 for inference failures, 503 when
//! the inference queue is full, 400 for oversized batches, 413 for bodies
//! over the size limit.

use crate::common::{app_with, json_request, send, test_pipeline, FakeBackend, MultipartBody};
use axum::http::StatusCode;
use siglip_embed_server::api::{create_app, AppState};
use siglip_embed_server::embeddings::PipelineConfig;
use std::time::Duration;

#[tokio::test]
async fn test_inference_failure_is_500() {
    let app = app_with(FakeBackend::failing(), PipelineConfig::default());
    let (status, body) = send(app, json_request("/embed/text", r#"{"texts": ["x"]}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_type"], "internal_error");
    assert!(body["detail"].as_str().unwrap().contains("fake session failure"));
}

#[tokio::test]
async fn test_wrong_dimension_output_is_500() {
    let backend = FakeBackend {
        wrong_dim: Some(3),
        ..FakeBackend::default()
    };
    let app = app_with(backend, PipelineConfig::default());
    let (status, _) = send(app, json_request("/embed/text", r#"{"texts": ["x"]}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_batch_over_limit_is_400() {
    let config = PipelineConfig {
        max_batch_size: 2,
        ..PipelineConfig::default()
    };
    let app = app_with(FakeBackend::new(), config);
    let (status, body) = send(
        app,
        json_request("/embed/text", r#"{"texts": ["a", "b", "c"]}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("cannot contain more than 2 items"));
}

#[tokio::test]
async fn test_full_queue_is_503() {
    let config = PipelineConfig {
        max_batch_size: 64,
        max_concurrent_inferences: 1,
        max_queued_requests: 0,
    };
    let app = app_with(FakeBackend::slow(Duration::from_millis(500)), config);

    let first = {
        let app = app.clone();
        tokio::spawn(async move {
            send(app, json_request("/embed/text", r#"{"texts": ["slow"]}"#)).await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, body) = send(app, json_request("/embed/text", r#"{"texts": ["fast"]}"#)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_type"], "service_unavailable");

    let (first_status, _) = first.await.unwrap();
    assert_eq!(first_status, StatusCode::OK);
}

fn small_limit_app() -> axum::Router {
    create_app(AppState::new(test_pipeline()).with_max_request_bytes(1024))
}

#[tokio::test]
async fn test_oversized_json_body_is_413_with_error_body() {
    let texts: Vec<String> = (0..100).map(|i| format!("caption number {}", i)).collect();
    let body = serde_json::json!({ "texts": texts }).to_string();
    assert!(body.len() > 1024);

    let (status, body) = send(small_limit_app(), json_request("/embed/text", &body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error_type"], "payload_too_large");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_oversized_upload_is_413_with_error_body() {
    let request = MultipartBody::new()
        .file("file", "big.png", &vec![0u8; 4096])
        .into_request("/embed/image");

    let (status, body) = send(small_limit_app(), request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error_type"], "payload_too_large");
}
