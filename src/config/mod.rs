// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration from command-line flags and environment

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::api::fetch::FetchConfig;
use crate::api::predict::ImageSourceKind;
use crate::vision::model_store::ModelSource;
use crate::vision::profile::{ModelProfile, ProfileError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Invalid host address: {0}")]
    InvalidHost(String),

    #[error("Port must be non-zero")]
    InvalidPort,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Skin lesion classification server
#[derive(Parser, Debug, Clone)]
#[command(name = "skinlens-node")]
#[command(version)]
#[command(about = "HTTP inference service for skin lesion image classification", long_about = None)]
pub struct ServerConfig {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Local path of the ONNX classifier
    #[arg(long, env = "MODEL_PATH", default_value = "./models/skinlensAI.onnx")]
    pub model_path: PathBuf,

    /// Download the model from here when `model_path` is missing
    #[arg(long, env = "MODEL_URL")]
    pub model_url: Option<String>,

    /// Expected SHA-256 of the model file (hex)
    #[arg(long, env = "MODEL_SHA256")]
    pub model_sha256: Option<String>,

    /// Preprocessing and label profile: skinlens-v1, skinlens-v2, dermnet-21
    #[arg(long, env = "MODEL_PROFILE", default_value = "skinlens-v1")]
    pub profile: String,

    /// Where /predict reads images from: upload or url
    #[arg(long, env = "IMAGE_SOURCE", default_value = "upload")]
    pub source: ImageSourceKind,

    /// Timeout for fetching images by URL
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Permit image URLs that resolve to localhost or private ranges
    #[arg(long, env = "ALLOW_PRIVATE_URLS")]
    pub allow_private_urls: bool,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model_profile()?;
        self.socket_addr()?;

        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Zero("fetch timeout"));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::Zero("intra threads"));
        }

        Ok(())
    }

    pub fn model_profile(&self) -> Result<&'static ModelProfile, ConfigError> {
        Ok(ModelProfile::from_name(&self.profile)?)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn model_source(&self) -> ModelSource {
        let mut source = ModelSource::local(&self.model_path);
        source.remote_url = self.model_url.clone();
        source.sha256 = self.model_sha256.clone();
        source
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            block_private_hosts: !self.allow_private_urls,
            ..FetchConfig::default()
        }
    }
}
