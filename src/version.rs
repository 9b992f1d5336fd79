// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the SkinLens node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-onnx-classifier-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "multipart-upload",
    "image-url-fetch",
    "onnx-runtime",
    "model-profiles",
    "model-download",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("SkinLens Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
