// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Released SigLIP2 checkpoints

use serde::Serialize;

/// A known SigLIP2 checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelVariant {
    pub name: &'static str,
    /// Parameter count, e.g. "0.4B"
    pub params: &'static str,
    /// Embedding dimension (text and vision hidden size)
    pub dimensions: usize,
    /// Fixed input resolution; `None` for NaFlex variants
    pub image_size: Option<u32>,
    pub patch_size: u32,
    pub notes: &'static str,
}

impl ModelVariant {
    pub fn is_naflex(&self) -> bool {
        self.image_size.is_none()
    }
}

pub const MODEL_VARIANTS: &[ModelVariant] = &[
    ModelVariant {
        name: "google/siglip2-base-patch16-224",
        params: "0.4B",
        dimensions: 768,
        image_size: Some(224),
        patch_size: 16,
        notes: "~800MB, fastest, good baseline (production/speed)",
    },
    ModelVariant {
        name: "google/siglip2-base-patch16-naflex",
        params: "0.4B",
        dimensions: 768,
        image_size: None,
        patch_size: 16,
        notes: "flexible resolution, better for varied image sizes",
    },
    ModelVariant {
        name: "google/siglip2-large-patch16-256",
        params: "0.9B",
        dimensions: 1024,
        image_size: Some(256),
        patch_size: 16,
        notes: "better quality than base",
    },
    ModelVariant {
        name: "google/siglip2-large-patch16-384",
        params: "0.9B",
        dimensions: 1024,
        image_size: Some(384),
        patch_size: 16,
        notes: "higher resolution details",
    },
    ModelVariant {
        name: "google/siglip2-so400m-patch14-384",
        params: "1B",
        dimensions: 1152,
        image_size: Some(384),
        patch_size: 14,
        notes: "best fixed-resolution quality (quality/speed balance)",
    },
    ModelVariant {
        name: "google/siglip2-so400m-patch16-naflex",
        params: "1B",
        dimensions: 1152,
        image_size: None,
        patch_size: 16,
        notes: "flexible resolution, most popular",
    },
    ModelVariant {
        name: "google/siglip2-giant-opt-patch16-384",
        params: "2B",
        dimensions: 1536,
        image_size: Some(384),
        patch_size: 16,
        notes: "~4GB, highest quality, slowest",
    },
];

/// Looks up a known checkpoint by its HuggingFace name
pub fn find(name: &str) -> Option<&'static ModelVariant> {
    MODEL_VARIANTS.iter().find(|v| v.name == name)
}

pub fn all() -> &'static [ModelVariant] {
    MODEL_VARIANTS
}
