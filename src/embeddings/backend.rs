// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference backend seam
//!
//! The pipeline only talks to the model through this trait, so the ONNX
//! implementation can be swapped for a deterministic one in tests.

use anyhow::Result;
use image::RgbImage;
use serde::{Serialize, Serializer};

use crate::config::Device;
use crate::embeddings::math::LogitParams;

/// Vision tower input resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Fixed(u32),
    /// NaFlex: variable resolution
    Flexible,
}

impl Serialize for ImageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ImageSize::Fixed(size) => serializer.serialize_u32(*size),
            ImageSize::Flexible => serializer.serialize_str("flexible"),
        }
    }
}

/// A loaded cross-modal embedding model
///
/// Methods are blocking; callers run them on a blocking thread. Feature
/// methods return raw (unnormalized) embeddings, one per input, in order.
pub trait EmbeddingBackend: Send + Sync {
    fn model_name(&self) -> &str;

    fn device(&self) -> Device;

    fn text_dim(&self) -> usize;

    fn vision_dim(&self) -> usize;

    fn image_size(&self) -> ImageSize;

    fn logit_params(&self) -> LogitParams;

    fn text_features(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn image_features(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>>;
}
