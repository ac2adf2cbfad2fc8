// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod download;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// SigLIP2 embedding server CLI
#[derive(Parser, Debug)]
#[command(name = "siglip-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Model management tools for the SigLIP2 embedding server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download (or locate) model files ahead of serving
    Download(download::DownloadArgs),

    /// List known SigLIP2 checkpoints
    Models(download::ModelsArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Download(args) => download::download_model(args).await,
        Commands::Models(args) => download::list_models(args),
    }
}
