// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use skinlens_node::{
    api::{fetch::ImageFetcher, start_server, AppState},
    config::ServerConfig,
    vision::{ensure_model, InferencePipeline, OnnxClassifier},
};
use std::{env, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env fallbacks
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();
    if let Err(e) = config.validate() {
        eprintln!("❌ Invalid configuration: {}", e);
        std::process::exit(2);
    }

    println!("🚀 Starting {}", skinlens_node::version::get_version_string());
    println!("📦 BUILD VERSION: {}", skinlens_node::version::VERSION);
    info!("Features: {}", skinlens_node::version::FEATURES.join(", "));
    println!();

    let profile = config.model_profile()?;
    info!("Using model profile: {}", profile);

    // 1. Make the model artifact available locally
    let model_path = ensure_model(&config.model_source())
        .await
        .context("Failed to obtain classifier model")?;

    // 2. Load the classifier once; it is shared read-only afterwards
    let classifier = OnnxClassifier::new(&model_path, profile.input_shape(), config.intra_threads)
        .context("Failed to initialize classifier")?;

    let pipeline = InferencePipeline::new(Arc::new(classifier), profile);

    // 3. HTTP client for URL-sourced requests
    let fetcher = ImageFetcher::new(config.fetch_config())
        .context("Failed to build image fetch client")?;

    let state = AppState::new(pipeline, config.source, fetcher);
    let addr = config.socket_addr()?;

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("  Predict: POST http://{}/predict", addr);
    println!("  Health:  GET  http://{}/health", addr);
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    start_server(addr, state).await
}
