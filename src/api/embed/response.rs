// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response body shared by the embedding endpoints

use serde::{Deserialize, Serialize};

/// Response body for POST /embed/text, /embed/image and /embed/images
///
/// # Example
/// ```json
/// {
///   "embeddings": [[0.012, -0.034, ...]],
///   "dimensions": 768,
///   "model": "google/siglip2-base-patch16-naflex"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedResponse {
    /// One vector per input, in input order
    pub embeddings: Vec<Vec<f32>>,

    /// Length of each vector
    pub dimensions: usize,

    pub model: String,
}

impl EmbedResponse {
    pub fn new(embeddings: Vec<Vec<f32>>, model: impl Into<String>) -> Self {
        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        Self {
            embeddings,
            dimensions,
            model: model.into(),
        }
    }
}
