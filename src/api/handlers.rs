// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, http::Uri, Json};
use serde::Serialize;

use crate::api::http_server::AppState;
use crate::api::ApiError;
use crate::config::Device;
use crate::embeddings::ImageSize;

pub const MODEL_DESCRIPTION: &str =
    "SigLIP produces aligned text and image embeddings in the same vector space";

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub device: Device,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub model: String,
    pub device: Device,
    pub text_dim: usize,
    pub vision_dim: usize,
    pub image_size: ImageSize,
    pub cross_modal: bool,
    pub description: String,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = state.pipeline.backend();
    Json(HealthResponse {
        status: "ok".to_string(),
        model: backend.model_name().to_string(),
        device: backend.device(),
        dimensions: backend.text_dim(),
    })
}

/// GET /info
pub async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    let backend = state.pipeline.backend();
    Json(InfoResponse {
        model: backend.model_name().to_string(),
        device: backend.device(),
        text_dim: backend.text_dim(),
        vision_dim: backend.vision_dim(),
        image_size: backend.image_size(),
        cross_modal: true,
        description: MODEL_DESCRIPTION.to_string(),
    })
}

pub async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
