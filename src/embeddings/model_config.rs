// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! SigLIP2 `config.json` / `preprocessor_config.json` parsing

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::embeddings::math::LogitParams;
use crate::vision::preprocessing::{Normalization, SIGLIP_MEAN, SIGLIP_STD};

const DEFAULT_MAX_NUM_PATCHES: usize = 256;
const DEFAULT_PATCH_SIZE: u32 = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct TextConfig {
    pub hidden_size: usize,
    #[serde(default)]
    pub max_position_embeddings: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    pub hidden_size: usize,
    /// Absent for NaFlex checkpoints
    #[serde(default)]
    pub image_size: Option<u32>,
    #[serde(default)]
    pub patch_size: Option<u32>,
    #[serde(default)]
    pub num_patches: Option<usize>,
}

/// Subset of the HuggingFace model `config.json`
#[derive(Debug, Clone, Deserialize)]
pub struct SiglipConfig {
    pub text_config: TextConfig,
    pub vision_config: VisionConfig,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub logit_scale: Option<f32>,
    #[serde(default)]
    pub logit_bias: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessorSize {
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// Subset of `preprocessor_config.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreprocessorConfig {
    #[serde(default)]
    pub image_mean: Option<[f32; 3]>,
    #[serde(default)]
    pub image_std: Option<[f32; 3]>,
    #[serde(default)]
    pub max_num_patches: Option<usize>,
    #[serde(default)]
    pub patch_size: Option<u32>,
    #[serde(default)]
    pub size: Option<ProcessorSize>,
}

/// How images are turned into vision tower inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisionInputMode {
    Fixed {
        size: u32,
    },
    Naflex {
        patch_size: u32,
        max_num_patches: usize,
    },
}

/// Explicit logit parameter overrides (CLI / environment)
#[derive(Debug, Clone, Copy, Default)]
pub struct LogitOverrides {
    pub scale: Option<f32>,
    pub bias: Option<f32>,
}

impl SiglipConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model config {}", path.display()))
    }

    /// Override -> config.json -> built-in default, per parameter
    pub fn logit_params(&self, overrides: LogitOverrides) -> LogitParams {
        let defaults = LogitParams::default();
        LogitParams {
            logit_scale: overrides
                .scale
                .or(self.logit_scale)
                .unwrap_or(defaults.logit_scale),
            logit_bias: overrides
                .bias
                .or(self.logit_bias)
                .unwrap_or(defaults.logit_bias),
        }
    }

    /// Names of the logit parameters that fall back to the built-in values
    pub fn default_logit_fields(&self, overrides: LogitOverrides) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if overrides.scale.or(self.logit_scale).is_none() {
            fields.push("logit_scale");
        }
        if overrides.bias.or(self.logit_bias).is_none() {
            fields.push("logit_bias");
        }
        fields
    }
}

impl PreprocessorConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preprocessor config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse preprocessor config {}", path.display()))
    }

    pub fn normalization(&self) -> Normalization {
        Normalization {
            mean: self.image_mean.unwrap_or(SIGLIP_MEAN),
            std: self.image_std.unwrap_or(SIGLIP_STD),
        }
    }
}

/// Derives the vision input layout from both configs
///
/// A checkpoint without `vision_config.image_size` is NaFlex. Zero sizes
/// or patch counts are rejected.
pub fn vision_input_mode(
    config: &SiglipConfig,
    preprocessor: &PreprocessorConfig,
) -> Result<VisionInputMode> {
    let mode = match config.vision_config.image_size {
        Some(size) => VisionInputMode::Fixed {
            size: preprocessor
                .size
                .as_ref()
                .and_then(|s| s.height)
                .unwrap_or(size),
        },
        None => VisionInputMode::Naflex {
            patch_size: preprocessor
                .patch_size
                .or(config.vision_config.patch_size)
                .unwrap_or(DEFAULT_PATCH_SIZE),
            max_num_patches: preprocessor
                .max_num_patches
                .or(config.vision_config.num_patches)
                .unwrap_or(DEFAULT_MAX_NUM_PATCHES),
        },
    };

    match mode {
        VisionInputMode::Fixed { size: 0 } => anyhow::bail!("Image size must be positive"),
        VisionInputMode::Naflex { patch_size: 0, .. } => {
            anyhow::bail!("patch_size must be positive")
        }
        VisionInputMode::Naflex {
            max_num_patches: 0, ..
        } => anyhow::bail!("max_num_patches must be positive"),
        mode => Ok(mode),
    }
}
