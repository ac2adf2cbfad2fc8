// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use std::fmt::Write as _;
use tracing::info;

use crate::config::{variants, ModelArgs};
use crate::embeddings::model_config::{vision_input_mode, PreprocessorConfig, SiglipConfig};
use crate::embeddings::{ModelLoader, VisionInputMode};

/// Arguments for the download command
#[derive(Args, Debug)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for the models command
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Print the table as JSON
    #[arg(long)]
    pub json: bool,
}

const RECOMMENDATIONS: &[(&str, &str)] = &[
    ("Production/Speed", "google/siglip2-base-patch16-224"),
    ("Quality/Speed balance", "google/siglip2-so400m-patch14-384"),
    ("Maximum quality", "google/siglip2-giant-opt-patch16-384"),
    ("Variable image sizes", "*-naflex variants"),
];

/// Resolves the model files, downloading what is missing
pub async fn download_model(args: DownloadArgs) -> Result<()> {
    let loader = ModelLoader::new(&args.model);
    println!(
        "📥 Fetching {} ({}) into {}",
        loader.model_name(),
        loader.repo_id(),
        args.model.model_cache.display()
    );

    let files = loader.resolve().await?;
    info!("Model files: {:?}", files);

    let config = SiglipConfig::from_file(&files.config)?;
    let preprocessor = match &files.preprocessor_config {
        Some(path) => PreprocessorConfig::from_file(path)?,
        None => PreprocessorConfig::default(),
    };

    println!("\n✅ Model ready: {}", loader.model_name());
    println!("   Text dim: {}", config.text_config.hidden_size);
    println!("   Vision dim: {}", config.vision_config.hidden_size);
    match vision_input_mode(&config, &preprocessor)? {
        VisionInputMode::Fixed { size } => println!("   Image size: {}", size),
        VisionInputMode::Naflex {
            max_num_patches, ..
        } => println!(
            "   Image size: flexible (naflex, up to {} patches)",
            max_num_patches
        ),
    }
    Ok(())
}

pub fn list_models(args: ModelsArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(variants::all())?);
    } else {
        print!("{}", variants_table());
    }
    Ok(())
}

/// Human-readable variants table with recommendations
pub fn variants_table() -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40} {:>6} {:>5} {:>9}  {}",
        "MODEL", "PARAMS", "DIM", "RES", "NOTES"
    );
    for v in variants::all() {
        let resolution = match v.image_size {
            Some(size) => format!("{}px", size),
            None => "flexible".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<40} {:>6} {:>5} {:>9}  {}",
            v.name, v.params, v.dimensions, resolution, v.notes
        );
    }

    let _ = writeln!(out, "\nRecommendations:");
    for (use_case, model) in RECOMMENDATIONS {
        let _ = writeln!(out, "  - {}: {}", use_case, model);
    }
    out
}
