// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers for predict API tests

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use skinlens_node::api::fetch::{FetchConfig, ImageFetcher};
use skinlens_node::api::http_server::AppState;
use skinlens_node::api::predict::ImageSourceKind;
use skinlens_node::vision::classifier::{check_shape, Classifier, ClassifierError};
use skinlens_node::vision::pipeline::InferencePipeline;
use skinlens_node::vision::profile::ModelProfile;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Body length served by the oversized routes
pub const LARGE_BODY_LEN: usize = 4096;

/// Classifier returning fixed scores and recording what it was given
pub struct StubClassifier {
    scores: Result<Vec<f32>, ClassifierError>,
    expected_shape: [usize; 4],
    calls: AtomicUsize,
    last_input: Mutex<Option<Array4<f32>>>,
}

impl StubClassifier {
    pub fn new(profile: &ModelProfile, scores: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            scores: Ok(scores),
            expected_shape: profile.input_shape(),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        })
    }

    pub fn failing(profile: &ModelProfile, message: &str) -> Arc<Self> {
        Arc::new(Self {
            scores: Err(ClassifierError::Inference(message.to_string())),
            expected_shape: profile.input_shape(),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<Array4<f32>> {
        self.last_input.lock().unwrap().clone()
    }
}

impl Classifier for StubClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(input.clone());
        check_shape(input, self.expected_shape)?;
        self.scores.clone()
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Scores with the maximum at `index`
pub fn one_hot(len: usize, index: usize) -> Vec<f32> {
    let mut scores = vec![0.01; len];
    scores[index] = 0.9;
    scores
}

pub fn build_state(
    profile: &'static ModelProfile,
    source: ImageSourceKind,
    classifier: Arc<StubClassifier>,
    block_private_hosts: bool,
) -> AppState {
    build_state_with_fetch(
        profile,
        source,
        classifier,
        FetchConfig {
            block_private_hosts,
            ..FetchConfig::default()
        },
    )
}

pub fn build_state_with_fetch(
    profile: &'static ModelProfile,
    source: ImageSourceKind,
    classifier: Arc<StubClassifier>,
    fetch: FetchConfig,
) -> AppState {
    let pipeline = InferencePipeline::new(classifier, profile);
    let fetcher = ImageFetcher::new(fetch).unwrap();
    AppState::new(pipeline, source, fetcher)
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

const BOUNDARY: &str = "----skinlens-test-boundary";

/// POST /predict with a single multipart file field
pub fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// POST /predict with a JSON body
pub fn json_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve test images on an ephemeral local port
///
/// - `/lesion.png`: 64x48 red PNG
/// - `/lesion.jpg`: 300x200 JPEG
/// - `/notes.txt`: plain text
/// - `/large.png`: [`LARGE_BODY_LEN`] bytes with a Content-Length
/// - `/slow.png`: PNG sent after a two second delay
/// - anything else: 404
pub async fn spawn_image_server() -> SocketAddr {
    let png = png_bytes(64, 48, [200, 30, 30]);
    let slow_png = png.clone();
    let jpg = jpeg_bytes(300, 200, [120, 80, 60]);

    let app = Router::new()
        .route(
            "/lesion.png",
            get(move || {
                let png = png.clone();
                async move { ([(header::CONTENT_TYPE, "image/png")], png).into_response() }
            }),
        )
        .route(
            "/lesion.jpg",
            get(move || {
                let jpg = jpg.clone();
                async move { ([(header::CONTENT_TYPE, "image/jpeg")], jpg).into_response() }
            }),
        )
        .route(
            "/notes.txt",
            get(|| async { (StatusCode::OK, "definitely not an image").into_response() }),
        )
        .route(
            "/large.png",
            get(|| async {
                ([(header::CONTENT_TYPE, "image/png")], vec![0u8; LARGE_BODY_LEN]).into_response()
            }),
        )
        .route(
            "/slow.png",
            get(move || {
                let png = slow_png.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    ([(header::CONTENT_TYPE, "image/png")], png).into_response()
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Serve [`LARGE_BODY_LEN`] bytes with no Content-Length header
///
/// The body is delimited by closing the connection, so only a running
/// byte count can catch it.
pub async fn spawn_unsized_body_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&vec![0u8; LARGE_BODY_LEN]).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}
