// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model file resolution
//!
//! Resolves a SigLIP2 model name to the ONNX towers, tokenizer and configs
//! on disk. Lookup order:
//! 1. a plain directory `<cache>/<org>--<name>/` (files flat or under `onnx/`)
//! 2. the HuggingFace Hub cache inside `<cache>` for the ONNX repository
//! 3. a Hub download, unless offline

use anyhow::{Context, Result};
use hf_hub::{api::tokio::ApiBuilder, Cache, Repo, RepoType};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ModelArgs;

const TEXT_MODEL: &str = "onnx/text_model.onnx";
const VISION_MODEL: &str = "onnx/vision_model.onnx";
const TOKENIZER: &str = "tokenizer.json";
const CONFIG: &str = "config.json";
const PREPROCESSOR_CONFIG: &str = "preprocessor_config.json";

/// Paths of everything needed to construct the backend
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub text_model: PathBuf,
    pub vision_model: PathBuf,
    pub tokenizer: PathBuf,
    pub config: PathBuf,
    pub preprocessor_config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ModelLoader {
    model_name: String,
    repo_id: String,
    cache_dir: PathBuf,
    offline: bool,
}

impl ModelLoader {
    pub fn new(args: &ModelArgs) -> Self {
        Self {
            model_name: args.model_name.clone(),
            repo_id: args.onnx_repo(),
            cache_dir: args.model_cache.clone(),
            offline: args.offline,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// `<cache>/<org>--<name>`
    pub fn local_dir(&self) -> PathBuf {
        self.cache_dir.join(self.model_name.replace('/', "--"))
    }

    /// Finds or fetches all model files
    pub async fn resolve(&self) -> Result<ModelFiles> {
        let local_missing = match self.find_local() {
            Ok(files) => {
                info!("Using local model directory {}", self.local_dir().display());
                return Ok(files);
            }
            Err(missing) => missing,
        };

        let cached_missing = match self.find_cached() {
            Ok(files) => {
                info!("Using cached model files for {}", self.repo_id);
                return Ok(files);
            }
            Err(missing) => missing,
        };

        if self.offline {
            anyhow::bail!(
                "Model file {} for {} not found and offline mode is enabled ({} missing from {}, {} missing from the {} hub cache in {})",
                cached_missing,
                self.model_name,
                local_missing,
                self.local_dir().display(),
                cached_missing,
                self.repo_id,
                self.cache_dir.display()
            );
        }

        self.download().await
    }

    /// Plain directory layout, no hub metadata
    ///
    /// Errors with the first required file that is missing.
    pub fn find_local(&self) -> Result<ModelFiles, &'static str> {
        let dir = self.local_dir();

        let find = |name: &str| -> Option<PathBuf> {
            let flat = dir.join(Path::new(name).file_name()?);
            let nested = dir.join(name);
            [flat, nested].into_iter().find(|p| p.is_file())
        };
        let pick = |name: &'static str| find(name).ok_or(name);

        Ok(ModelFiles {
            text_model: pick(TEXT_MODEL)?,
            vision_model: pick(VISION_MODEL)?,
            tokenizer: pick(TOKENIZER)?,
            config: pick(CONFIG)?,
            preprocessor_config: find(PREPROCESSOR_CONFIG),
        })
    }

    /// Snapshot in the hub cache; errors like [`Self::find_local`]
    pub fn find_cached(&self) -> Result<ModelFiles, &'static str> {
        let cache = Cache::new(self.cache_dir.clone());
        let repo = cache.repo(Repo::new(self.repo_id.clone(), RepoType::Model));
        let pick = |name: &'static str| repo.get(name).ok_or(name);

        Ok(ModelFiles {
            text_model: pick(TEXT_MODEL)?,
            vision_model: pick(VISION_MODEL)?,
            tokenizer: pick(TOKENIZER)?,
            config: pick(CONFIG)?,
            preprocessor_config: repo.get(PREPROCESSOR_CONFIG),
        })
    }

    async fn download(&self) -> Result<ModelFiles> {
        info!(
            "Downloading {} from {} into {}",
            self.model_name,
            self.repo_id,
            self.cache_dir.display()
        );

        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("Failed to create model cache {}", self.cache_dir.display())
        })?;

        let api = ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .with_progress(true)
            .build()
            .context("Failed to initialize HuggingFace Hub client")?;
        let repo = api.repo(Repo::new(self.repo_id.clone(), RepoType::Model));

        let fetch = |name: &'static str| {
            let repo = &repo;
            async move {
                debug!("Fetching {}", name);
                repo.get(name)
                    .await
                    .with_context(|| format!("Failed to download {} from {}", name, self.repo_id))
            }
        };

        let config = fetch(CONFIG).await?;
        let tokenizer = fetch(TOKENIZER).await?;
        let text_model = fetch(TEXT_MODEL).await?;
        let vision_model = fetch(VISION_MODEL).await?;

        // Large exports keep weights in an external data file next to the graph
        for external in ["onnx/text_model.onnx_data", "onnx/vision_model.onnx_data"] {
            if let Err(e) = repo.get(external).await {
                debug!("No external data file {}: {}", external, e);
            }
        }

        let preprocessor_config = match repo.get(PREPROCESSOR_CONFIG).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("No {} in {}: {}", PREPROCESSOR_CONFIG, self.repo_id, e);
                None
            }
        };

        info!("✅ Model files downloaded for {}", self.model_name);

        Ok(ModelFiles {
            text_model,
            vision_model,
            tokenizer,
            config,
            preprocessor_config,
        })
    }
}
