// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /similarity and POST /rank

use crate::common::{as_matrix, blue_png, green_png, l2_norm, red_png, send, test_app, MultipartBody};
use axum::http::StatusCode;

#[tokio::test]
async fn test_similarity_matrix_shape_and_range() {
    let request = MultipartBody::new()
        .file("files", "red.png", &red_png())
        .file("files", "green.png", &green_png())
        .file("files", "blue.png", &blue_png())
        .text("texts", r#"["something red", "a green field"]"#)
        .into_request("/similarity");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"], "Similarities are sigmoid-normalized (0-1 range)");

    let similarities = as_matrix(&body["similarities"]);
    assert_eq!(similarities.len(), 2);
    assert!(similarities.iter().all(|row| row.len() == 3));
    assert!(similarities.iter().flatten().all(|s| (0.0..=1.0).contains(s)));

    // Matching color scores near 1, others near 0
    assert!(similarities[0][0] > 0.99);
    assert!(similarities[0][1] < 0.01);
    assert!(similarities[1][1] > 0.99);

    let text_embeddings = as_matrix(&body["text_embeddings"]);
    let image_embeddings = as_matrix(&body["image_embeddings"]);
    assert_eq!(text_embeddings.len(), 2);
    assert_eq!(image_embeddings.len(), 3);
    for v in text_embeddings.iter().chain(&image_embeddings) {
        assert!((l2_norm(v) - 1.0).abs() < 1e-5);
    }
}

#[tokio::test]
async fn test_similarity_scores_are_independent() {
    // Two matching images both score high; a softmax would split them
    let request = MultipartBody::new()
        .file("files", "red1.png", &red_png())
        .file("files", "red2.png", &red_png())
        .text("texts", r#"["red"]"#)
        .into_request("/similarity");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    let similarities = as_matrix(&body["similarities"]);
    assert!(similarities[0].iter().all(|s| *s > 0.99));
}

#[tokio::test]
async fn test_similarity_texts_must_be_json_array() {
    let request = MultipartBody::new()
        .file("files", "red.png", &red_png())
        .text("texts", "just a sentence")
        .into_request("/similarity");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "texts");
}

#[tokio::test]
async fn test_similarity_empty_texts_is_400() {
    let request = MultipartBody::new()
        .file("files", "red.png", &red_png())
        .text("texts", "[]")
        .into_request("/similarity");
    let (status, _) = send(test_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rank_orders_best_match_first() {
    let request = MultipartBody::new()
        .file("files", "green.png", &green_png())
        .file("files", "red.png", &red_png())
        .file("files", "blue.png", &blue_png())
        .text("query", "a bright red square")
        .into_request("/rank");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "a bright red square");

    let rankings = body["rankings"].as_array().unwrap();
    let files: Vec<&str> = rankings
        .iter()
        .map(|r| r["filename"].as_str().unwrap())
        .collect();
    let ranks: Vec<u64> = rankings.iter().map(|r| r["rank"].as_u64().unwrap()).collect();

    // Green and blue tie, so they keep upload order
    assert_eq!(files, vec!["red.png", "green.png", "blue.png"]);
    assert_eq!(ranks, vec![1, 2, 3]);
    assert!(rankings[0]["score"].as_f64().unwrap() > 0.99);
}

#[tokio::test]
async fn test_rank_unnamed_files_get_index_names() {
    let request = MultipartBody::new()
        .file("files", "", &red_png())
        .text("query", "red")
        .into_request("/rank");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rankings"][0]["filename"], "image_0");
}

#[tokio::test]
async fn test_rank_blank_query_is_400() {
    let request = MultipartBody::new()
        .file("files", "red.png", &red_png())
        .text("query", "   ")
        .into_request("/rank");
    let (status, body) = send(test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "query");
}

#[tokio::test]
async fn test_rank_missing_query_is_400() {
    let request = MultipartBody::new()
        .file("files", "red.png", &red_png())
        .into_request("/rank");
    let (status, _) = send(test_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
