// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector post-processing: normalization, sigmoid scoring, ranking

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Norm floor used by L2 normalization
pub const NORM_EPSILON: f32 = 1e-12;

/// Scales a vector to unit L2 norm in place
///
/// Divides by `max(norm, NORM_EPSILON)`, so a zero vector stays zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    let divisor = norm.max(NORM_EPSILON);
    for value in vector.iter_mut() {
        *value /= divisor;
    }
}

pub fn l2_normalize_all(vectors: &mut [Vec<f32>]) {
    for vector in vectors.iter_mut() {
        l2_normalize(vector);
    }
}

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Parameters of the SigLIP sigmoid head
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogitParams {
    /// Log-space temperature; the logit is multiplied by `exp(logit_scale)`
    pub logit_scale: f32,
    pub logit_bias: f32,
}

impl Default for LogitParams {
    fn default() -> Self {
        Self {
            logit_scale: 4.7649,
            logit_bias: -12.9324,
        }
    }
}

impl LogitParams {
    /// Raw text-image compatibility logit for unit vectors
    pub fn logit(&self, text: &[f32], image: &[f32]) -> f32 {
        dot(text, image) * self.logit_scale.exp() + self.logit_bias
    }

    /// Independent match probability in [0, 1]
    pub fn score(&self, text: &[f32], image: &[f32]) -> f32 {
        sigmoid(self.logit(text, image))
    }
}

/// [texts x images] sigmoid similarity matrix over unit vectors
///
/// Each cell is scored on its own; rows are not normalized across images.
pub fn similarity_matrix(
    text_embeddings: &[Vec<f32>],
    image_embeddings: &[Vec<f32>],
    params: &LogitParams,
) -> Vec<Vec<f32>> {
    text_embeddings
        .iter()
        .map(|text| {
            image_embeddings
                .iter()
                .map(|image| params.score(text, image))
                .collect()
        })
        .collect()
}

/// One entry of a ranking response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub filename: String,
    /// Display score, rounded to 4 decimal digits
    pub score: f64,
    /// 1-based position
    pub rank: usize,
}

/// Sorts images by descending score; equal scores keep input order
pub fn rank_by_score(filenames: Vec<String>, scores: &[f32]) -> Vec<RankedResult> {
    let mut pairs: Vec<(String, f32)> = filenames.into_iter().zip(scores.iter().copied()).collect();

    // sort_by is stable
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    pairs
        .into_iter()
        .enumerate()
        .map(|(i, (filename, score))| RankedResult {
            filename,
            score: round_display(score),
            rank: i + 1,
        })
        .collect()
}

fn round_display(score: f32) -> f64 {
    (score as f64 * 10_000.0).round() / 10_000.0
}
