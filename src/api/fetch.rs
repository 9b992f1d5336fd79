// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote image fetching for URL-sourced predictions
//!
//! With `block_private_hosts` set, a target is checked three times: the
//! submitted URL, every redirect hop, and every address a host name
//! resolves to. Only public addresses are ever connected to.

use bytes::{Bytes, BytesMut};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::vision::image_utils::MAX_IMAGE_SIZE;

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 5;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Refusing to fetch image from non-public address: {0}")]
    BlockedHost(String),

    #[error("Timeout fetching image: {0}")]
    Timeout(String),

    #[error("Failed to fetch image: {0}")]
    Http(String),

    #[error("Failed to fetch image: HTTP {0} for {1}")]
    Status(u16, String),

    #[error("Fetched image exceeds {0} bytes")]
    TooLarge(usize),
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_bytes: usize,
    /// Refuse loopback, private, link-local and other non-public targets
    pub block_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_bytes: MAX_IMAGE_SIZE,
            block_private_hosts: true,
        }
    }
}

/// Shared HTTP client for downloading images by URL
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    config: FetchConfig,
}

impl ImageFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let block = config.block_private_hosts;

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("skinlens-node/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect_policy(block));

        if block {
            // A proxy would resolve host names itself
            builder = builder
                .dns_resolver(Arc::new(PublicOnlyResolver))
                .no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Download the image bytes behind `url`
    ///
    /// Any transport error or non-2xx status is a failure; there is no retry.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = self.validate_url(url)?;
        self.download(parsed).await
    }

    async fn download(&self, url: Url) -> Result<Bytes, FetchError> {
        let url_str = url.to_string();
        debug!("Fetching image from: {}", url_str);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(&e, &url_str))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16(), url_str));
        }

        if let Some(len) = response.content_length() {
            if len > self.config.max_bytes as u64 {
                return Err(FetchError::TooLarge(self.config.max_bytes));
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| classify_error(&e, &url_str))?
        {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(FetchError::TooLarge(self.config.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Fetched {} bytes from {}", body.len(), url_str);

        Ok(body.freeze())
    }

    fn validate_url(&self, url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url.trim()).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        check_target(&parsed, self.config.block_private_hosts)?;
        Ok(parsed)
    }
}

/// Scheme and host check applied to the submitted URL and to every redirect
fn check_target(url: &Url, block_private_hosts: bool) -> Result<(), FetchError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    if block_private_hosts && !is_public_host(url) {
        return Err(FetchError::BlockedHost(url.to_string()));
    }
    Ok(())
}

fn redirect_policy(block_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(FetchError::Http(format!(
                "more than {} redirects",
                MAX_REDIRECTS
            )));
        }
        match check_target(attempt.url(), block_private_hosts) {
            Ok(()) => attempt.follow(),
            Err(e) => {
                warn!("Refusing redirect: {}", e);
                attempt.error(e)
            }
        }
    })
}

/// Map a reqwest failure, surfacing a `FetchError` raised by the redirect
/// policy or resolver
fn classify_error(err: &reqwest::Error, url: &str) -> FetchError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if let Some(fetch_err) = e.downcast_ref::<FetchError>() {
            return fetch_err.clone();
        }
        source = e.source();
    }

    if err.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Http(err.to_string())
    }
}

/// Resolver that drops non-public addresses
#[derive(Debug, Clone, Copy, Default)]
struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let addrs = resolve_public(name.as_str()).await?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<Addrs, BoxError>(addrs)
        })
    }
}

async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>, BoxError> {
    let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
    let public: Vec<SocketAddr> = resolved
        .iter()
        .copied()
        .filter(|addr| is_public_ip(addr.ip()))
        .collect();

    if public.is_empty() {
        debug!("{} resolved only to non-public addresses: {:?}", host, resolved);
        return Err(Box::new(FetchError::BlockedHost(host.to_string())));
    }
    Ok(public)
}

/// Whether the URL host may be fetched from
///
/// Literal addresses are checked here. Domain names other than `localhost`
/// pass and are checked again at resolution time.
pub fn is_public_host(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            domain != "localhost" && !domain.ends_with(".localhost")
        }
        Some(url::Host::Ipv4(ip)) => is_public_ipv4(ip),
        Some(url::Host::Ipv6(ip)) => is_public_ipv6(ip),
        None => false,
    }
}

pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_public_ipv4(ip),
        IpAddr::V6(ip) => is_public_ipv6(ip),
    }
}

fn is_public_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let this_network = a == 0;
    let shared_cgnat = a == 100 && (b & 0xc0) == 64;

    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || this_network
        || shared_cgnat)
}

fn is_public_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_ipv4(v4);
    }

    let segments = ip.segments();
    // NAT64 well-known prefix 64:ff9b::/96
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let [a, b] = segments[6].to_be_bytes();
        let [c, d] = segments[7].to_be_bytes();
        return is_public_ipv4(Ipv4Addr::new(a, b, c, d));
    }

    let link_local = (segments[0] & 0xffc0) == 0xfe80;
    let unique_local = (segments[0] & 0xfe00) == 0xfc00;

    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || link_local || unique_local)
}
