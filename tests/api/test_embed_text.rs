// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed/text

use crate::common::{as_matrix, json_request, l2_norm, send, test_app, FAKE_DIM, FAKE_MODEL};
use axum::http::StatusCode;

#[tokio::test]
async fn test_embed_text_returns_one_vector_per_text() {
    let request = json_request(
        "/embed/text",
        r#"{"texts": ["a red car", "a cat on a sofa", "mountains at dawn"]}"#,
    );
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], FAKE_MODEL);
    assert_eq!(body["dimensions"], FAKE_DIM);

    let embeddings = as_matrix(&body["embeddings"]);
    assert_eq!(embeddings.len(), 3);
    for embedding in &embeddings {
        assert_eq!(embedding.len(), FAKE_DIM);
        assert!((l2_norm(embedding) - 1.0).abs() < 1e-5);
    }
}

#[tokio::test]
async fn test_embed_text_preserves_order() {
    let (_, single) = send(
        test_app(),
        json_request("/embed/text", r#"{"texts": ["mountains at dawn"]}"#),
    )
    .await;
    let (_, batch) = send(
        test_app(),
        json_request(
            "/embed/text",
            r#"{"texts": ["a cat on a sofa", "mountains at dawn"]}"#,
        ),
    )
    .await;

    let single = as_matrix(&single["embeddings"]);
    let batch = as_matrix(&batch["embeddings"]);
    assert_eq!(batch[1], single[0]);
    assert_ne!(batch[0], single[0]);
}

#[tokio::test]
async fn test_embed_text_without_normalization() {
    let (status, body) = send(
        test_app(),
        json_request("/embed/text", r#"{"texts": ["blue sky"], "normalize": false}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let embeddings = as_matrix(&body["embeddings"]);
    // Fake color texts have raw norm 2
    assert!((l2_norm(&embeddings[0]) - 2.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_embed_text_empty_batch_is_400() {
    let (status, body) = send(test_app(), json_request("/embed/text", r#"{"texts": []}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
    assert_eq!(body["details"]["field"], "texts");
}

#[tokio::test]
async fn test_embed_text_non_string_entry_is_400() {
    let (status, body) = send(
        test_app(),
        json_request("/embed/text", r#"{"texts": ["ok", 7]}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
}

#[tokio::test]
async fn test_embed_text_malformed_json_is_400() {
    let (status, _) = send(test_app(), json_request("/embed/text", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
