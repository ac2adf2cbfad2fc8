// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! SigLIP2 embedding engine
//!
//! - `backend`: the model seam used by the pipeline
//! - `onnx_model`: ONNX Runtime implementation of both towers
//! - `model_loader` / `model_config`: locating and reading model files
//! - `pipeline`: request-level operations (embed, similarity, rank)
//! - `gate`: bounded admission to the shared model
//! - `math`: normalization and sigmoid scoring

pub mod backend;
pub mod gate;
pub mod math;
pub mod model_config;
pub mod model_loader;
pub mod onnx_model;
pub mod pipeline;

pub use backend::{EmbeddingBackend, ImageSize};
pub use gate::{GateError, InferenceGate};
pub use math::{LogitParams, RankedResult};
pub use model_config::{LogitOverrides, VisionInputMode};
pub use model_loader::{ModelFiles, ModelLoader};
pub use onnx_model::{OnnxModelOptions, OnnxSiglipModel};
pub use pipeline::{
    EmbedError, EmbeddingPipeline, ImageSource, NamedImage, PipelineConfig, SimilarityOutput,
};
