// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::debug;

use super::response::{RankResponse, SimilarityResponse};
use crate::api::http_server::AppState;
use crate::api::multipart::MultipartForm;
use crate::api::ApiError;

/// POST /similarity
///
/// Multipart fields: repeated `files` and `texts`, a JSON-encoded array of
/// strings. Every text is scored against every image.
pub async fn similarity_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SimilarityResponse>, ApiError> {
    let form = MultipartForm::from_request(multipart).await?;

    let raw = form
        .text("texts")?
        .ok_or_else(|| ApiError::validation("texts", "texts field is required"))?;
    let texts = parse_texts(&raw)?;
    let images = form.images("files");
    debug!(
        "Similarity request: {} texts x {} images",
        texts.len(),
        images.len()
    );

    let output = state.pipeline.compute_similarity(texts, images).await?;
    Ok(Json(output.into()))
}

/// POST /rank
///
/// Multipart fields: repeated `files` and a `query` string.
pub async fn rank_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RankResponse>, ApiError> {
    let form = MultipartForm::from_request(multipart).await?;

    let query = form
        .text("query")?
        .ok_or_else(|| ApiError::validation("query", "query field is required"))?;
    let images = form.images("files");
    debug!("Rank request: {} images", images.len());

    let rankings = state.pipeline.rank_images(query.clone(), images).await?;
    Ok(Json(RankResponse { query, rankings }))
}

fn parse_texts(raw: &str) -> Result<Vec<String>, ApiError> {
    serde_json::from_str(raw).map_err(|e| {
        ApiError::validation(
            "texts",
            format!("texts must be a JSON array of strings: {}", e),
        )
    })
}
