// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedding request pipeline
//!
//! request -> decode inputs -> backend inference -> normalize / score / sort
//!
//! The pipeline owns the shared backend behind an [`InferenceGate`]. Image
//! decoding runs on the blocking pool before a gate permit is taken, and
//! inference runs on the blocking pool while holding one.

use bytes::Bytes;
use image::RgbImage;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::embeddings::backend::EmbeddingBackend;
use crate::embeddings::gate::{GateError, InferenceGate};
use crate::embeddings::math::{self, RankedResult};
use crate::vision::{decode_base64_image, decode_image_bytes, ImageError};

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Invalid image{}: {source}", describe_image(.index, .filename))]
    Decode {
        index: Option<usize>,
        filename: Option<String>,
        #[source]
        source: ImageError,
    },

    #[error("Inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("Inference queue is full, retry later")]
    Busy,

    #[error("Server is shutting down")]
    ShuttingDown,
}

fn describe_image(index: &Option<usize>, filename: &Option<String>) -> String {
    match (index, filename) {
        (Some(i), Some(name)) => format!(" at index {} ({})", i, name),
        (Some(i), None) => format!(" at index {}", i),
        (None, Some(name)) => format!(" ({})", name),
        (None, None) => String::new(),
    }
}

impl EmbedError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EmbedError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<GateError> for EmbedError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Busy => EmbedError::Busy,
            GateError::ShuttingDown => EmbedError::ShuttingDown,
        }
    }
}

/// Image payload for a single-image request
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes(Bytes),
    /// Base64 text, optionally with a data-URI prefix
    Base64(String),
}

/// An uploaded image and the identifier it is reported under
#[derive(Debug, Clone)]
pub struct NamedImage {
    pub filename: String,
    pub data: Bytes,
}

impl NamedImage {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_batch_size: usize,
    pub max_concurrent_inferences: usize,
    pub max_queued_requests: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 64,
            max_concurrent_inferences: 1,
            max_queued_requests: 32,
        }
    }
}

/// Result of a joint text/image scoring call
#[derive(Debug, Clone)]
pub struct SimilarityOutput {
    /// [texts x images], each cell in [0, 1]
    pub similarities: Vec<Vec<f32>>,
    /// Unit-norm text embeddings
    pub text_embeddings: Vec<Vec<f32>>,
    /// Unit-norm image embeddings
    pub image_embeddings: Vec<Vec<f32>>,
}

pub struct EmbeddingPipeline {
    backend: Arc<dyn EmbeddingBackend>,
    gate: InferenceGate,
    config: PipelineConfig,
}

impl std::fmt::Debug for EmbeddingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingPipeline")
            .field("model", &self.backend.model_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EmbeddingPipeline {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, config: PipelineConfig) -> Self {
        let gate = InferenceGate::new(config.max_concurrent_inferences, config.max_queued_requests);
        Self {
            backend,
            gate,
            config,
        }
    }

    pub fn backend(&self) -> &dyn EmbeddingBackend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stops admitting inference work
    pub fn shutdown(&self) {
        self.gate.close();
    }

    /// Embeds a batch of texts, one vector per text, in input order
    pub async fn embed_text(
        &self,
        texts: Vec<String>,
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.check_batch("texts", texts.len())?;
        debug!("Embedding {} texts (normalize: {})", texts.len(), normalize);

        let count = texts.len();
        let mut embeddings = self
            .infer(move |backend| backend.text_features(&texts))
            .await?;
        self.check_output("text", &embeddings, count, self.backend.text_dim())?;

        if normalize {
            math::l2_normalize_all(&mut embeddings);
        }
        Ok(embeddings)
    }

    /// Embeds one image given as raw bytes or base64
    pub async fn embed_image(
        &self,
        source: ImageSource,
        normalize: bool,
    ) -> Result<Vec<f32>, EmbedError> {
        let image = run_blocking(move || match source {
            ImageSource::Bytes(bytes) => decode_image_bytes(&bytes),
            ImageSource::Base64(text) => decode_base64_image(&text),
        })
        .await?
        .map_err(|source| EmbedError::Decode {
            index: None,
            filename: None,
            source,
        })?;

        let mut embeddings = self.image_embeddings(vec![image]).await?;
        let mut embedding = embeddings.pop().ok_or_else(|| {
            EmbedError::Inference(anyhow::anyhow!("backend returned no image embedding"))
        })?;

        if normalize {
            math::l2_normalize(&mut embedding);
        }
        Ok(embedding)
    }

    /// Embeds a batch of images; any undecodable image fails the whole call
    pub async fn embed_images(
        &self,
        images: Vec<NamedImage>,
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.check_batch("files", images.len())?;
        let decoded = decode_all(images).await?;

        let mut embeddings = self.image_embeddings(decoded).await?;
        if normalize {
            math::l2_normalize_all(&mut embeddings);
        }
        Ok(embeddings)
    }

    /// Scores every text against every image with the sigmoid head
    pub async fn compute_similarity(
        &self,
        texts: Vec<String>,
        images: Vec<NamedImage>,
    ) -> Result<SimilarityOutput, EmbedError> {
        self.check_batch("texts", texts.len())?;
        self.check_batch("files", images.len())?;
        let decoded = decode_all(images).await?;

        let text_count = texts.len();
        let image_count = decoded.len();
        let (mut text_embeddings, mut image_embeddings) = self
            .infer(move |backend| {
                let text = backend.text_features(&texts)?;
                let image = backend.image_features(&decoded)?;
                Ok((text, image))
            })
            .await?;
        self.check_output("text", &text_embeddings, text_count, self.backend.text_dim())?;
        self.check_output(
            "image",
            &image_embeddings,
            image_count,
            self.backend.vision_dim(),
        )?;

        math::l2_normalize_all(&mut text_embeddings);
        math::l2_normalize_all(&mut image_embeddings);

        let similarities = math::similarity_matrix(
            &text_embeddings,
            &image_embeddings,
            &self.backend.logit_params(),
        );

        Ok(SimilarityOutput {
            similarities,
            text_embeddings,
            image_embeddings,
        })
    }

    /// Ranks images by relevance to one query, best first
    pub async fn rank_images(
        &self,
        query: String,
        images: Vec<NamedImage>,
    ) -> Result<Vec<RankedResult>, EmbedError> {
        if query.trim().is_empty() {
            return Err(EmbedError::validation("query", "query cannot be empty"));
        }

        let filenames: Vec<String> = images.iter().map(|i| i.filename.clone()).collect();
        let output = self.compute_similarity(vec![query], images).await?;
        let scores = output.similarities.into_iter().next().unwrap_or_default();

        Ok(math::rank_by_score(filenames, &scores))
    }

    async fn image_embeddings(&self, images: Vec<RgbImage>) -> Result<Vec<Vec<f32>>, EmbedError> {
        let count = images.len();
        let embeddings = self
            .infer(move |backend| backend.image_features(&images))
            .await?;
        self.check_output("image", &embeddings, count, self.backend.vision_dim())?;
        Ok(embeddings)
    }

    async fn infer<T, F>(&self, f: F) -> Result<T, EmbedError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn EmbeddingBackend) -> anyhow::Result<T> + Send + 'static,
    {
        let _permit = self.gate.acquire().await?;
        let backend = Arc::clone(&self.backend);
        run_blocking(move || f(backend.as_ref()))
            .await?
            .map_err(EmbedError::Inference)
    }

    fn check_batch(&self, field: &str, len: usize) -> Result<(), EmbedError> {
        if len == 0 {
            return Err(EmbedError::validation(
                field,
                format!("{} must contain at least 1 item", field),
            ));
        }
        if len > self.config.max_batch_size {
            return Err(EmbedError::validation(
                field,
                format!(
                    "{} cannot contain more than {} items (got {})",
                    field, self.config.max_batch_size, len
                ),
            ));
        }
        Ok(())
    }

    fn check_output(
        &self,
        kind: &str,
        embeddings: &[Vec<f32>],
        expected_count: usize,
        expected_dim: usize,
    ) -> Result<(), EmbedError> {
        if embeddings.len() != expected_count {
            return Err(EmbedError::Inference(anyhow::anyhow!(
                "backend returned {} {} embeddings for {} inputs",
                embeddings.len(),
                kind,
                expected_count
            )));
        }
        if let Some((i, e)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != expected_dim)
        {
            return Err(EmbedError::Inference(anyhow::anyhow!(
                "unexpected {} embedding dimension at index {}: {} (expected {})",
                kind,
                i,
                e.len(),
                expected_dim
            )));
        }
        Ok(())
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, EmbedError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EmbedError::Inference(anyhow::anyhow!("blocking task failed: {}", e)))
}

async fn decode_all(images: Vec<NamedImage>) -> Result<Vec<RgbImage>, EmbedError> {
    run_blocking(move || {
        images
            .into_iter()
            .enumerate()
            .map(|(index, image)| {
                decode_image_bytes(&image.data).map_err(|source| EmbedError::Decode {
                    index: Some(index),
                    filename: Some(image.filename),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    })
    .await?
}
