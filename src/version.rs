// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the SigLIP2 embedding server

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-siglip2-onnx-2025-11-20";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-20";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "text-embeddings",
    "image-embeddings",
    "batch-image-embeddings",
    "sigmoid-similarity",
    "image-ranking",
    "naflex",
    "cuda-fallback",
    "bounded-inference-queue",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("SigLIP2 Embedding Server {} ({})", VERSION_NUMBER, BUILD_DATE)
}
