// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Classifier artifact acquisition
//!
//! The model is read from a local path. When the file is missing and a
//! remote URL is configured, it is downloaded once and cached at that path.
//! Any download failure is fatal to startup.

use anyhow::{Context, Result};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Where the classifier artifact comes from
#[derive(Debug, Clone)]
pub struct ModelSource {
    /// Local cache path (also the load path)
    pub local_path: PathBuf,
    /// Object-storage URL used when the local file is missing
    pub remote_url: Option<String>,
    /// Expected hex SHA-256 of the artifact
    pub sha256: Option<String>,
    pub download_timeout: Duration,
}

impl ModelSource {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: path.into(),
            remote_url: None,
            sha256: None,
            download_timeout: Duration::from_secs(300),
        }
    }
}

/// Make sure the model file exists locally, downloading it if needed
///
/// # Returns
/// The local path to load the classifier from.
///
/// # Errors
/// - file missing and no remote URL configured
/// - download returns a non-success status or fails in transit
/// - checksum mismatch when `sha256` is set
pub async fn ensure_model(source: &ModelSource) -> Result<PathBuf> {
    let path = &source.local_path;

    if path.exists() {
        info!("Using cached model at {}", path.display());
        return Ok(path.clone());
    }

    let url = source.remote_url.as_deref().with_context(|| {
        format!(
            "Model file not found at {} and no download URL configured",
            path.display()
        )
    })?;

    info!("Model not cached, downloading from {}", url);

    let client = Client::builder()
        .timeout(source.download_timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download model from {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Failed to download model: HTTP {} from {}", status.as_u16(), url);
    }

    let bytes = response
        .bytes()
        .await
        .context("Failed to read model download body")?;

    if let Some(expected) = source.sha256.as_deref() {
        verify_checksum(&bytes, expected)?;
    } else {
        warn!("No checksum configured, skipping model verification");
    }

    write_atomically(path, &bytes)?;

    info!("✅ Model downloaded ({} bytes) to {}", bytes.len(), path.display());

    Ok(path.clone())
}

/// Hex SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn verify_checksum(bytes: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(bytes);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        anyhow::bail!(
            "Model checksum mismatch: expected {}, got {}",
            expected.trim(),
            actual
        );
    }
    Ok(())
}

// A partial download never lands at the final path
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).context("Failed to create temp file")?;
    tmp.write_all(bytes).context("Failed to write model bytes")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to move model into {}", path.display()))?;

    Ok(())
}
