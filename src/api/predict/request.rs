// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict request types and image source selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::errors::PredictError;

/// Multipart field carrying the uploaded image
pub const UPLOAD_FIELD: &str = "image";

pub const NO_IMAGE_UPLOADED: &str = "No image uploaded";

pub const NO_IMAGE_URL: &str = "No image URL provided";

/// Where `/predict` reads the image from, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSourceKind {
    /// Multipart form field `image`
    Upload,
    /// JSON body `{"imageUrl": "..."}`
    Url,
}

impl ImageSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSourceKind::Upload => "upload",
            ImageSourceKind::Url => "url",
        }
    }
}

impl fmt::Display for ImageSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upload" | "file" => Ok(ImageSourceKind::Upload),
            "url" => Ok(ImageSourceKind::Url),
            other => Err(format!(
                "unsupported image source '{}', expected 'upload' or 'url'",
                other
            )),
        }
    }
}

/// JSON body for URL-sourced predictions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPredictRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

impl UrlPredictRequest {
    /// Return the URL to fetch, or a missing-input error
    pub fn validate(&self) -> Result<&str, PredictError> {
        match self.image_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(PredictError::MissingInput(NO_IMAGE_URL.to_string())),
        }
    }
}
