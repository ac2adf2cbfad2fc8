// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed/image and POST /embed/images

use crate::common::{
    as_matrix, blue_png, green_png, l2_norm, red_png, send, test_app, MultipartBody, FAKE_DIM,
};
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};

#[tokio::test]
async fn test_embed_image_from_file() {
    let request = MultipartBody::new()
        .file("file", "red.png", &red_png())
        .into_request("/embed/image");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dimensions"], FAKE_DIM);
    let embeddings = as_matrix(&body["embeddings"]);
    assert_eq!(embeddings.len(), 1);
    assert!((l2_norm(&embeddings[0]) - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_base64_and_bytes_give_same_embedding() {
    let png = green_png();
    let encoded = STANDARD.encode(&png);

    let (_, from_file) = send(
        test_app(),
        MultipartBody::new()
            .file("file", "green.png", &png)
            .into_request("/embed/image"),
    )
    .await;
    let (_, from_base64) = send(
        test_app(),
        MultipartBody::new()
            .text("image_base64", &encoded)
            .into_request("/embed/image"),
    )
    .await;
    let (status, from_data_uri) = send(
        test_app(),
        MultipartBody::new()
            .text("image_base64", &format!("data:image/png;base64,{}", encoded))
            .into_request("/embed/image"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(from_file["embeddings"], from_base64["embeddings"]);
    assert_eq!(from_file["embeddings"], from_data_uri["embeddings"]);
}

#[tokio::test]
async fn test_embed_image_without_image_is_400() {
    let request = MultipartBody::new()
        .text("normalize", "true")
        .into_request("/embed/image");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No image provided");
}

#[tokio::test]
async fn test_empty_file_part_counts_as_absent() {
    let request = MultipartBody::new()
        .file("file", "", b"")
        .into_request("/embed/image");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No image provided");
}

#[tokio::test]
async fn test_invalid_base64_is_decode_error() {
    let request = MultipartBody::new()
        .text("image_base64", "!!!not-base64!!!")
        .into_request("/embed/image");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "decode_error");
}

#[tokio::test]
async fn test_normalize_flag_parsing() {
    let request = MultipartBody::new()
        .file("file", "red.png", &red_png())
        .text("normalize", "off")
        .into_request("/embed/image");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    let embeddings = as_matrix(&body["embeddings"]);
    // Fake red image has raw norm 3
    assert!((l2_norm(&embeddings[0]) - 3.0).abs() < 1e-4);

    let request = MultipartBody::new()
        .file("file", "red.png", &red_png())
        .text("normalize", "perhaps")
        .into_request("/embed/image");
    let (status, body) = send(test_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "normalize");
}

#[tokio::test]
async fn test_embed_images_preserves_order() {
    let request = MultipartBody::new()
        .file("files", "red.png", &red_png())
        .file("files", "green.png", &green_png())
        .file("files", "blue.png", &blue_png())
        .into_request("/embed/images");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    let embeddings = as_matrix(&body["embeddings"]);
    assert_eq!(embeddings.len(), 3);
    for (i, embedding) in embeddings.iter().enumerate() {
        // Each solid color lands on its own axis
        assert!((embedding[i] - 1.0).abs() < 1e-5, "image {} = {:?}", i, embedding);
    }
}

#[tokio::test]
async fn test_one_corrupt_image_fails_whole_batch() {
    let request = MultipartBody::new()
        .file("files", "red.png", &red_png())
        .file("files", "broken.jpg", b"\xFF\xD8\xFFthis is not a jpeg")
        .file("files", "blue.png", &blue_png())
        .into_request("/embed/images");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "decode_error");
    assert_eq!(body["details"]["index"], 1);
    assert_eq!(body["details"]["filename"], "broken.jpg");
    assert!(body.get("embeddings").is_none());
}

#[tokio::test]
async fn test_embed_images_without_files_is_400() {
    let request = MultipartBody::new()
        .text("normalize", "true")
        .into_request("/embed/images");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "files");
}
