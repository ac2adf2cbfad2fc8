// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health, GET /info and unknown routes

use crate::common::{get_request, send, test_app, FAKE_DIM, FAKE_MODEL};
use axum::http::StatusCode;

#[tokio::test]
async fn test_health_reports_model() {
    let (status, body) = send(test_app(), get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], FAKE_MODEL);
    assert_eq!(body["device"], "cpu");
    assert_eq!(body["dimensions"], FAKE_DIM);
}

#[tokio::test]
async fn test_info_describes_both_towers() {
    let (status, body) = send(test_app(), get_request("/info")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text_dim"], FAKE_DIM);
    assert_eq!(body["vision_dim"], FAKE_DIM);
    assert_eq!(body["image_size"], 224);
    assert_eq!(body["cross_modal"], true);
    assert!(body["description"].as_str().unwrap().contains("same vector space"));
}

#[tokio::test]
async fn test_unknown_route_is_404_with_error_body() {
    let (status, body) = send(test_app(), get_request("/v1/embed")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
    assert!(body["detail"].as_str().unwrap().contains("/v1/embed"));
}

#[tokio::test]
async fn test_get_on_post_route_is_rejected() {
    let (status, _) = send(test_app(), get_request("/embed/text")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
