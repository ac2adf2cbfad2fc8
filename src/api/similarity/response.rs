// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::embeddings::{RankedResult, SimilarityOutput};

pub const SIMILARITY_NOTE: &str = "Similarities are sigmoid-normalized (0-1 range)";

/// Response body for POST /similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResponse {
    /// [texts x images]
    pub similarities: Vec<Vec<f32>>,
    pub text_embeddings: Vec<Vec<f32>>,
    pub image_embeddings: Vec<Vec<f32>>,
    pub note: String,
}

impl From<SimilarityOutput> for SimilarityResponse {
    fn from(output: SimilarityOutput) -> Self {
        Self {
            similarities: output.similarities,
            text_embeddings: output.text_embeddings,
            image_embeddings: output.image_embeddings,
            note: SIMILARITY_NOTE.to_string(),
        }
    }
}

/// Response body for POST /rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankResponse {
    pub query: String,
    /// Best match first, ranks starting at 1
    pub rankings: Vec<RankedResult>,
}
