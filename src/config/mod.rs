// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every setting can be given as a CLI flag or an environment variable
//! (a `.env` file is loaded first by the binaries).

pub mod variants;

use clap::{builder::BoolishValueParser, Args, ValueEnum};
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

pub use variants::{ModelVariant, MODEL_VARIANTS};

use crate::embeddings::{LogitOverrides, PipelineConfig};

pub const DEFAULT_MODEL_NAME: &str = "google/siglip2-base-patch16-naflex";

/// Requested compute device
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum DeviceRequest {
    /// Try CUDA, fall back to CPU
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// Device the backend actually runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// Model location settings, shared by the server and `siglip-cli download`
#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// HuggingFace model name of the SigLIP2 checkpoint
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    /// Directory holding model files and the HuggingFace cache
    #[arg(long, env = "MODEL_CACHE", default_value = "/app/models")]
    pub model_cache: PathBuf,

    /// Never contact the HuggingFace Hub
    #[arg(
        long = "offline",
        env = "HF_HUB_OFFLINE",
        default_value = "false",
        value_parser = BoolishValueParser::new()
    )]
    pub offline: bool,

    /// ONNX export repository (default: onnx-community/<basename>-ONNX)
    #[arg(long, env = "ONNX_REPO")]
    pub onnx_repo: Option<String>,
}

impl ModelArgs {
    /// Repository the ONNX towers are fetched from
    pub fn onnx_repo(&self) -> String {
        match &self.onnx_repo {
            Some(repo) => repo.clone(),
            None => {
                let basename = self
                    .model_name
                    .rsplit('/')
                    .next()
                    .unwrap_or(&self.model_name);
                format!("onnx-community/{}-ONNX", basename)
            }
        }
    }
}

/// Full server configuration
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Compute device for inference
    #[arg(long, env = "DEVICE", value_enum, default_value_t = DeviceRequest::Auto)]
    pub device: DeviceRequest,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "API_PORT", default_value_t = 8091)]
    pub port: u16,

    /// Maximum texts or images per request
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = 64)]
    pub max_batch_size: usize,

    /// Inferences allowed to run at once against the shared model
    #[arg(long, env = "MAX_CONCURRENT_INFERENCES", default_value_t = 1)]
    pub max_concurrent_inferences: usize,

    /// Requests allowed to wait for an inference slot before 503
    #[arg(long, env = "MAX_QUEUED_REQUESTS", default_value_t = 32)]
    pub max_queued_requests: usize,

    /// Request body limit in bytes
    #[arg(long, env = "MAX_REQUEST_BYTES", default_value_t = 64 * 1024 * 1024)]
    pub max_request_bytes: usize,

    /// ONNX Runtime intra-op threads per session
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Token length texts are padded/truncated to
    #[arg(long, env = "TEXT_MAX_LENGTH", default_value_t = 64)]
    pub text_max_length: usize,

    /// Override for the sigmoid head's log-space temperature
    #[arg(long, env = "LOGIT_SCALE", allow_hyphen_values = true)]
    pub logit_scale: Option<f32>,

    /// Override for the sigmoid head's bias
    #[arg(long, env = "LOGIT_BIAS", allow_hyphen_values = true)]
    pub logit_bias: Option<f32>,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", addr, e))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_batch_size: self.max_batch_size,
            max_concurrent_inferences: self.max_concurrent_inferences,
            max_queued_requests: self.max_queued_requests,
        }
    }

    pub fn logit_overrides(&self) -> LogitOverrides {
        LogitOverrides {
            scale: self.logit_scale,
            bias: self.logit_bias,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_batch_size == 0 {
            anyhow::bail!("max_batch_size must be greater than 0");
        }
        if self.max_concurrent_inferences == 0 {
            anyhow::bail!("max_concurrent_inferences must be greater than 0");
        }
        if self.text_max_length == 0 {
            anyhow::bail!("text_max_length must be greater than 0");
        }
        self.listen_addr()?;
        Ok(())
    }
}
