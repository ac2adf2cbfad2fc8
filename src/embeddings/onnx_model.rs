// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX SigLIP2 model wrapper
//!
//! Runs the separately exported text and vision towers with ONNX Runtime.
//!
//! Features:
//! - CUDA execution provider with CPU fallback (`DEVICE=auto`)
//! - Gemma tokenization padded and truncated to a fixed length
//! - Fixed-resolution and NaFlex vision inputs, chosen from `config.json`
//! - Pooled (projected) outputs selected by name from graph metadata

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{Array2, ArrayViewD, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use crate::config::{variants, Device, DeviceRequest};
use crate::embeddings::backend::{EmbeddingBackend, ImageSize};
use crate::embeddings::math::LogitParams;
use crate::embeddings::model_config::{
    vision_input_mode, LogitOverrides, PreprocessorConfig, SiglipConfig, VisionInputMode,
};
use crate::embeddings::model_loader::ModelFiles;
use crate::vision::preprocessing::{self, Normalization};

const TEXT_OUTPUTS: &[&str] = &["text_embeds", "pooler_output"];
const VISION_OUTPUTS: &[&str] = &["image_embeds", "pooler_output"];

/// Session and tokenizer settings
#[derive(Debug, Clone)]
pub struct OnnxModelOptions {
    pub device: DeviceRequest,
    pub intra_threads: usize,
    pub text_max_length: usize,
    pub logit_overrides: LogitOverrides,
}

impl Default for OnnxModelOptions {
    fn default() -> Self {
        Self {
            device: DeviceRequest::Auto,
            intra_threads: 4,
            text_max_length: 64,
            logit_overrides: LogitOverrides::default(),
        }
    }
}

/// One ONNX tower and what we learned about its graph at load time
struct Tower {
    session: Mutex<Session>,
    inputs: Vec<String>,
    output_index: usize,
}

impl Tower {
    fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|i| i == name)
    }
}

/// SigLIP2 dual-tower model on ONNX Runtime
///
/// Sessions sit behind a `Mutex` since `Session::run` needs `&mut`; the
/// pipeline's gate bounds how many callers wait on them.
#[derive(Clone)]
pub struct OnnxSiglipModel {
    text: Arc<Tower>,
    vision: Arc<Tower>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    device: Device,
    text_dim: usize,
    vision_dim: usize,
    vision_mode: VisionInputMode,
    normalization: Normalization,
    logit_params: LogitParams,
}

impl std::fmt::Debug for OnnxSiglipModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSiglipModel")
            .field("model_name", &self.model_name)
            .field("device", &self.device)
            .field("text_dim", &self.text_dim)
            .field("vision_dim", &self.vision_dim)
            .field("vision_mode", &self.vision_mode)
            .finish_non_exhaustive()
    }
}

impl OnnxSiglipModel {
    /// Loads both towers, the tokenizer and the configs
    ///
    /// Blocking; call from `spawn_blocking` inside a runtime.
    ///
    /// # Errors
    /// Returns error if a file is missing or invalid, if the requested
    /// device cannot be initialized, or if a tower's graph exposes no usable
    /// pooled output.
    pub fn load(
        model_name: impl Into<String>,
        files: &ModelFiles,
        options: &OnnxModelOptions,
    ) -> Result<Self> {
        let model_name = model_name.into();

        let config = SiglipConfig::from_file(&files.config)?;
        let preprocessor = match &files.preprocessor_config {
            Some(path) => PreprocessorConfig::from_file(path)?,
            None => PreprocessorConfig::default(),
        };
        let vision_mode = vision_input_mode(&config, &preprocessor)
            .with_context(|| format!("Invalid vision settings for {}", model_name))?;
        let normalization = preprocessor.normalization();
        let logit_params = config.logit_params(options.logit_overrides);
        let defaulted = config.default_logit_fields(options.logit_overrides);
        if !defaulted.is_empty() {
            warn!(
                "⚠️  Using built-in {} for {} ({:?}); similarity scores may not match this checkpoint, set LOGIT_SCALE / LOGIT_BIAS",
                defaulted.join(" and "),
                model_name,
                logit_params
            );
        }

        info!("🚀 Loading SigLIP2 model {} ({:?})", model_name, vision_mode);

        let (text_session, text_device) =
            build_session(&files.text_model, options.device, options.intra_threads)?;
        let (vision_session, vision_device) =
            build_session(&files.vision_model, options.device, options.intra_threads)?;
        let device = if text_device == Device::Cuda && vision_device == Device::Cuda {
            Device::Cuda
        } else {
            Device::Cpu
        };

        let text = Tower::new(text_session, TEXT_OUTPUTS, "text")?;
        let vision = Tower::new(vision_session, VISION_OUTPUTS, "vision")?;

        let naflex_graph = vision.has_input("spatial_shapes");
        if naflex_graph != matches!(vision_mode, VisionInputMode::Naflex { .. }) {
            warn!(
                "⚠️  Vision graph inputs {:?} disagree with config mode {:?}",
                vision.inputs, vision_mode
            );
        }

        let tokenizer = load_tokenizer(&files.tokenizer, options.text_max_length)?;

        let text_dim = config.text_config.hidden_size;
        let vision_dim = config.vision_config.hidden_size;
        if let Some(variant) = variants::find(&model_name) {
            if variant.dimensions != text_dim || variant.dimensions != vision_dim {
                warn!(
                    "⚠️  {} is listed with {} dimensions but config reports text {} / vision {}",
                    model_name, variant.dimensions, text_dim, vision_dim
                );
            }
        }

        info!(
            "✅ SigLIP2 model loaded on {} (text dim {}, vision dim {})",
            device, text_dim, vision_dim
        );

        Ok(Self {
            text: Arc::new(text),
            vision: Arc::new(vision),
            tokenizer: Arc::new(tokenizer),
            model_name,
            device,
            text_dim,
            vision_dim,
            vision_mode,
            normalization,
            logit_params,
        })
    }

    pub fn vision_mode(&self) -> VisionInputMode {
        self.vision_mode
    }

    fn tokenize(&self, texts: &[String]) -> Result<(Array2<i64>, Array2<i64>)> {
        encode_texts(&self.tokenizer, texts)
    }
}

/// Token ids and the tokenizer's attention mask, both `[batch, max_length]`
fn encode_texts(tokenizer: &Tokenizer, texts: &[String]) -> Result<(Array2<i64>, Array2<i64>)> {
    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let encodings = tokenizer
        .encode_batch(inputs, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
    let mut ids = Vec::with_capacity(texts.len() * seq_len);
    let mut mask = Vec::with_capacity(texts.len() * seq_len);
    for encoding in &encodings {
        ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
        mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
    }

    let input_ids = Array2::from_shape_vec((texts.len(), seq_len), ids)
        .context("Failed to create input_ids array")?;
    let attention_mask = Array2::from_shape_vec((texts.len(), seq_len), mask)
        .context("Failed to create attention_mask array")?;
    Ok((input_ids, attention_mask))
}

impl Tower {
    fn new(session: Session, preferred_outputs: &[&str], kind: &str) -> Result<Self> {
        let inputs: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let outputs: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        if outputs.is_empty() {
            anyhow::bail!("{} model declares no outputs", kind);
        }

        // Fall back to the first output when no pooled name is present
        let output_index = preferred_outputs
            .iter()
            .find_map(|name| outputs.iter().position(|o| o == name))
            .unwrap_or(0);

        debug!(
            "{} tower inputs {:?}, using output {:?}",
            kind, inputs, outputs[output_index]
        );

        Ok(Self {
            session: Mutex::new(session),
            inputs,
            output_index,
        })
    }
}

impl EmbeddingBackend for OnnxSiglipModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn device(&self) -> Device {
        self.device
    }

    fn text_dim(&self) -> usize {
        self.text_dim
    }

    fn vision_dim(&self) -> usize {
        self.vision_dim
    }

    fn image_size(&self) -> ImageSize {
        match self.vision_mode {
            VisionInputMode::Fixed { size } => ImageSize::Fixed(size),
            VisionInputMode::Naflex { .. } => ImageSize::Flexible,
        }
    }

    fn logit_params(&self) -> LogitParams {
        self.logit_params
    }

    fn text_features(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let (input_ids, attention_mask) = self.tokenize(texts)?;

        let mut session = self
            .text
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Text session lock poisoned"))?;

        // SigLIP text towers usually take no mask; pass the tokenizer's
        // mask only if the export declares it
        let outputs = if self.text.has_input("attention_mask") {
            session.run(ort::inputs![
                "input_ids" => Value::from_array(input_ids)?,
                "attention_mask" => Value::from_array(attention_mask)?
            ])?
        } else {
            session.run(ort::inputs!["input_ids" => Value::from_array(input_ids)?])?
        };

        let array = outputs[self.text.output_index]
            .try_extract_array::<f32>()
            .context("Failed to extract text output tensor")?;
        pooled_rows(array, texts.len(), "text")
    }

    fn image_features(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>> {
        if images.is_empty() {
            return Ok(vec![]);
        }

        let mut session = self
            .vision
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Vision session lock poisoned"))?;

        let outputs = match self.vision_mode {
            VisionInputMode::Fixed { size } => {
                let pixel_values =
                    preprocessing::fixed_resolution_batch(images, size, &self.normalization);
                session.run(ort::inputs!["pixel_values" => Value::from_array(pixel_values)?])?
            }
            VisionInputMode::Naflex {
                patch_size,
                max_num_patches,
            } => {
                let batch = preprocessing::naflex_batch(
                    images,
                    patch_size,
                    max_num_patches,
                    &self.normalization,
                );
                session.run(ort::inputs![
                    "pixel_values" => Value::from_array(batch.pixel_values)?,
                    "pixel_attention_mask" => Value::from_array(batch.pixel_attention_mask)?,
                    "spatial_shapes" => Value::from_array(batch.spatial_shapes)?
                ])?
            }
        };

        let array = outputs[self.vision.output_index]
            .try_extract_array::<f32>()
            .context("Failed to extract vision output tensor")?;
        pooled_rows(array, images.len(), "vision")
    }
}

/// Splits a [batch, dim] output into rows
fn pooled_rows(array: ArrayViewD<'_, f32>, batch: usize, kind: &str) -> Result<Vec<Vec<f32>>> {
    let shape = array.shape();
    if shape.len() != 2 || shape[0] != batch {
        anyhow::bail!(
            "{} model output has unexpected shape {:?} (expected [{}, dim])",
            kind,
            shape,
            batch
        );
    }

    Ok(array
        .axis_iter(Axis(0))
        .map(|row| row.iter().copied().collect())
        .collect())
}

fn build_session(path: &Path, device: DeviceRequest, intra_threads: usize) -> Result<(Session, Device)> {
    if !path.exists() {
        anyhow::bail!("ONNX model file not found: {}", path.display());
    }

    if device != DeviceRequest::Cpu {
        info!("   Attempting CUDA execution provider for {}", path.display());
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build().error_on_failure()])
            .context("Failed to set CUDA execution provider")
            .and_then(|b| {
                b.with_optimization_level(GraphOptimizationLevel::Level3)
                    .context("Failed to set optimization level")
            })
            .and_then(|b| {
                b.with_intra_threads(intra_threads)
                    .context("Failed to set intra threads")
            })
            .and_then(|b| {
                b.commit_from_file(path)
                    .with_context(|| format!("Failed to load ONNX model from {}", path.display()))
            });

        match cuda_result {
            Ok(session) => {
                info!("✅ CUDA execution provider initialized");
                return Ok((session, Device::Cuda));
            }
            Err(e) if device == DeviceRequest::Cuda => {
                return Err(e.context("DEVICE=cuda requested but CUDA is unavailable"));
            }
            Err(e) => {
                warn!("⚠️  CUDA execution provider failed: {:#}", e);
                warn!("   Falling back to CPU execution provider");
            }
        }
    }

    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(path)
        .with_context(|| format!("Failed to load ONNX model from {}", path.display()))?;

    Ok((session, Device::Cpu))
}

/// Loads the tokenizer with fixed-length padding and truncation
fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer> {
    if !path.exists() {
        anyhow::bail!("Tokenizer file not found: {}", path.display());
    }

    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

    let pad_token = "<pad>".to_string();
    let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(max_length),
        pad_id,
        pad_token,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

    Ok(tokenizer)
}
