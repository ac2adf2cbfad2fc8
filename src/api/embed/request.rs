// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request body for POST /embed/text

use serde::{Deserialize, Serialize};

/// Request body for POST /embed/text
///
/// # Example
/// ```json
/// {
///   "texts": ["a photo of a cat", "a diagram"],
///   "normalize": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedTextRequest {
    /// Texts to embed, each independently
    pub texts: Vec<String>,

    /// L2-normalize each embedding (default: true)
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

fn default_normalize() -> bool {
    true
}
