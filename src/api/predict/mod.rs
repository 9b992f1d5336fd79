// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict API endpoint module
//!
//! Provides POST /predict for classifying a single image.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::predict_handler;
pub use request::{ImageSourceKind, UrlPredictRequest};
pub use response::PredictResponse;
