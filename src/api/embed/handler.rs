// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding endpoint handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::debug;

use super::request::EmbedTextRequest;
use super::response::EmbedResponse;
use crate::api::http_server::AppState;
use crate::api::multipart::MultipartForm;
use crate::api::ApiError;
use crate::embeddings::ImageSource;

/// POST /embed/text
///
/// # Errors
/// - 400: malformed JSON, non-string entries, empty or oversized batch
/// - 413: body over `MAX_REQUEST_BYTES`
/// - 503: inference queue full or server shutting down
/// - 500: inference failed
pub async fn embed_text_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmbedTextRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|e| ApiError::rejection(e.status(), ApiError::validation("body", e.body_text())))?;
    debug!(
        "Text embedding request: {} texts (normalize: {})",
        request.texts.len(),
        request.normalize
    );

    let embeddings = state
        .pipeline
        .embed_text(request.texts, request.normalize)
        .await?;

    Ok(Json(EmbedResponse::new(
        embeddings,
        state.pipeline.backend().model_name(),
    )))
}

/// POST /embed/image
///
/// Multipart fields:
/// - `file`: image file, or
/// - `image_base64`: base64 image, optionally a data URI
/// - `normalize`: boolean, default true
///
/// The `file` part wins when both are present.
pub async fn embed_image_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let form = MultipartForm::from_request(multipart).await?;
    let normalize = form.flag("normalize", true)?;

    let source = match form.part("file") {
        Some(part) => ImageSource::Bytes(part.data.clone()),
        None => match form.text("image_base64")? {
            Some(text) if !text.trim().is_empty() => ImageSource::Base64(text),
            _ => return Err(ApiError::validation("file", "No image provided")),
        },
    };
    debug!(
        "Image embedding request ({}, normalize: {})",
        match &source {
            ImageSource::Bytes(_) => "file",
            ImageSource::Base64(_) => "base64",
        },
        normalize
    );

    let embedding = state.pipeline.embed_image(source, normalize).await?;

    Ok(Json(EmbedResponse::new(
        vec![embedding],
        state.pipeline.backend().model_name(),
    )))
}

/// POST /embed/images
///
/// Multipart fields: repeated `files`, optional `normalize`. One
/// undecodable image fails the whole request.
pub async fn embed_images_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let form = MultipartForm::from_request(multipart).await?;
    let normalize = form.flag("normalize", true)?;
    let images = form.images("files");
    debug!(
        "Batch image embedding request: {} images (normalize: {})",
        images.len(),
        normalize
    );

    let embeddings = state.pipeline.embed_images(images, normalize).await?;

    Ok(Json(EmbedResponse::new(
        embeddings,
        state.pipeline.backend().model_name(),
    )))
}
