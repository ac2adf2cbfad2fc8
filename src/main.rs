// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use siglip_embed_server::{
    api::{shutdown_signal, start_server, AppState},
    config::ServerConfig,
    embeddings::{
        EmbeddingBackend, EmbeddingPipeline, ModelLoader, OnnxModelOptions, OnnxSiglipModel,
    },
    version,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "siglip-embed-server")]
#[command(version = version::VERSION_NUMBER)]
#[command(about = "Cross-modal SigLIP2 text/image embedding API", long_about = None)]
struct Args {
    #[command(flatten)]
    config: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Args::parse().config;
    config.validate()?;
    let addr = config.listen_addr()?;

    info!("🚀 Starting {}", version::get_version_string());
    info!(
        "   Model: {} (cache: {}, offline: {})",
        config.model.model_name,
        config.model.model_cache.display(),
        config.model.offline
    );

    let loader = ModelLoader::new(&config.model);
    let files = loader.resolve().await?;

    let options = OnnxModelOptions {
        device: config.device,
        intra_threads: config.intra_threads,
        text_max_length: config.text_max_length,
        logit_overrides: config.logit_overrides(),
    };
    let model_name = config.model.model_name.clone();
    let model = tokio::task::spawn_blocking(move || {
        OnnxSiglipModel::load(model_name, &files, &options)
    })
    .await
    .context("Model loading task failed")??;

    info!(
        "✅ Model ready on {} (text dim {}, vision dim {}, image size {:?})",
        model.device(),
        model.text_dim(),
        model.vision_dim(),
        model.image_size()
    );

    let pipeline = Arc::new(EmbeddingPipeline::new(
        Arc::new(model),
        config.pipeline_config(),
    ));
    let state =
        AppState::new(Arc::clone(&pipeline)).with_max_request_bytes(config.max_request_bytes);

    start_server(state, addr, shutdown_signal()).await?;

    pipeline.shutdown();
    info!("👋 Shutdown complete");
    Ok(())
}
