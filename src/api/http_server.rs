// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::fetch::ImageFetcher;
use super::predict::{predict_handler, ImageSourceKind};
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::pipeline::InferencePipeline;

/// Multipart framing allowance on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InferencePipeline>,
    pub source: ImageSourceKind,
    pub fetcher: Arc<ImageFetcher>,
}

impl AppState {
    pub fn new(pipeline: InferencePipeline, source: ImageSourceKind, fetcher: ImageFetcher) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            source,
            fetcher: Arc::new(fetcher),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub profile: String,
    pub source: String,
    pub version: String,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + MULTIPART_OVERHEAD))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.pipeline.classifier_name().to_string(),
        profile: state.pipeline.profile().name.to_string(),
        source: state.source.to_string(),
        version: crate::version::VERSION_NUMBER.to_string(),
    })
}

/// Bind `addr` and serve until Ctrl+C
pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    info!(
        "✅ Prediction API listening on http://{} (source: {}, profile: {})",
        local_addr,
        state.source,
        state.pipeline.profile().name
    );

    let app = create_app(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("⏹️  Shutdown signal received");
            }
        })
        .await?;

    info!("👋 Server stopped");
    Ok(())
}
