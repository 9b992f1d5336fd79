// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict endpoint handler

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    Json,
};
use axum_extra::extract::Multipart;
use tracing::{debug, info};

use super::request::{
    ImageSourceKind, UrlPredictRequest, NO_IMAGE_UPLOADED, UPLOAD_FIELD,
};
use super::response::PredictResponse;
use crate::api::errors::PredictError;
use crate::api::http_server::AppState;

/// Upper bound for the JSON body of a URL-sourced request
const MAX_JSON_BODY: usize = 64 * 1024;

/// POST /predict - Classify a single skin image
///
/// The image source is fixed at startup:
/// - `upload`: multipart form with the file in field `image`
/// - `url`: JSON body `{"imageUrl": "https://..."}`
///
/// # Response
/// - `prediction`: Label of the highest-scoring class
///
/// # Errors
/// - 400 Bad Request: No image supplied, malformed body, or fetch failure
/// - 500 Internal Server Error: Undecodable image or inference failure
pub async fn predict_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<PredictResponse>, PredictError> {
    debug!("Predict request received (source: {})", state.source);

    // 1. Obtain raw image bytes
    let bytes = match state.source {
        ImageSourceKind::Upload => read_upload(request).await?,
        ImageSourceKind::Url => {
            let body = read_url_request(request).await?;
            let url = body.validate()?;
            state.fetcher.fetch(url).await?
        }
    };

    // 2. Decode, preprocess and classify off the async runtime
    let pipeline = state.pipeline.clone();
    let prediction = tokio::task::spawn_blocking(move || pipeline.classify_bytes(&bytes))
        .await
        .map_err(|e| PredictError::Internal(format!("Inference task failed: {}", e)))??;

    info!(
        "Prediction complete: {} (class {}, {:.3} confidence, {}ms)",
        prediction.label,
        prediction.class_index,
        prediction.confidence,
        prediction.processing_time_ms
    );

    Ok(Json(PredictResponse::new(prediction.label)))
}

/// Pull the `image` field out of a multipart body
async fn read_upload(request: Request) -> Result<Bytes, PredictError> {
    let mut multipart = <Multipart as FromRequest<()>>::from_request(request, &())
        .await
        .map_err(|e| {
            debug!("Request is not multipart: {}", e);
            PredictError::MissingInput(NO_IMAGE_UPLOADED.to_string())
        })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PredictError::BadInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| PredictError::BadInput(format!("Failed to read upload: {}", e)))?;

        if data.is_empty() {
            return Err(PredictError::MissingInput(NO_IMAGE_UPLOADED.to_string()));
        }

        debug!(
            "Received upload {:?}: {} bytes",
            file_name.as_deref().unwrap_or("<unnamed>"),
            data.len()
        );
        return Ok(data);
    }

    Err(PredictError::MissingInput(NO_IMAGE_UPLOADED.to_string()))
}

async fn read_url_request(request: Request) -> Result<UrlPredictRequest, PredictError> {
    let body = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
        .await
        .map_err(|e| PredictError::BadInput(format!("Failed to read request body: {}", e)))?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(UrlPredictRequest::default());
    }

    serde_json::from_slice(&body)
        .map_err(|e| PredictError::BadInput(format!("Invalid JSON body: {}", e)))
}
