// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

use crate::api::fetch::FetchError;
use crate::vision::pipeline::PipelineError;

/// JSON error body: a single `error` message field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Closed set of failure kinds for the predict endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    /// Required input field absent (no upload, no URL)
    MissingInput(String),
    /// Request present but malformed
    BadInput(String),
    /// Remote image could not be fetched
    FetchFailed(String),
    /// Bytes could not be decoded as an image
    DecodeFailed(String),
    /// Shape mismatch or classifier failure
    Inference(String),
    Internal(String),
}

impl PredictError {
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::MissingInput(_) => "missing_input",
            PredictError::BadInput(_) => "bad_input",
            PredictError::FetchFailed(_) => "fetch_failed",
            PredictError::DecodeFailed(_) => "decode_failed",
            PredictError::Inference(_) => "inference",
            PredictError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::MissingInput(_)
            | PredictError::BadInput(_)
            | PredictError::FetchFailed(_) => StatusCode::BAD_REQUEST,
            PredictError::DecodeFailed(_)
            | PredictError::Inference(_)
            | PredictError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PredictError::MissingInput(msg)
            | PredictError::BadInput(msg)
            | PredictError::FetchFailed(msg)
            | PredictError::DecodeFailed(msg)
            | PredictError::Inference(msg)
            | PredictError::Internal(msg) => msg,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.message().to_string(),
        }
    }
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for PredictError {}

impl From<PipelineError> for PredictError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::Decode(_) => PredictError::DecodeFailed(message),
            PipelineError::Classifier(_) | PipelineError::EmptyOutput => {
                PredictError::Inference(message)
            }
        }
    }
}

impl From<FetchError> for PredictError {
    fn from(err: FetchError) -> Self {
        let message = err.to_string();
        match err {
            FetchError::InvalidUrl(_) | FetchError::BlockedHost(_) => {
                PredictError::BadInput(message)
            }
            _ => PredictError::FetchFailed(message),
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Prediction failed ({}): {}", self.kind(), self.message());
        } else {
            warn!("Prediction rejected ({}): {}", self.kind(), self.message());
        }

        (status, Json(self.to_response())).into_response()
    }
}
