// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Multipart upload tests for POST /predict
//!
//! These tests verify that:
//! - A valid upload returns `{"prediction": <label>}`
//! - A missing `image` field is a 400 and never reaches the classifier
//! - Any input size is resized to the profile resolution
//! - Undecodable bytes and classifier failures are 500s

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::json;
use skinlens_node::api::http_server::create_app;
use skinlens_node::api::predict::ImageSourceKind;
use skinlens_node::vision::profile::{
    DERMNET_21_PROFILE, SKINLENS_V1_PROFILE, SKINLENS_V2_PROFILE,
};
use tower::util::ServiceExt; // for `oneshot`

use super::common::{
    build_state, jpeg_bytes, multipart_request, one_hot, png_bytes, response_json,
    StubClassifier,
};

#[tokio::test]
async fn test_upload_returns_melanoma_for_index_10() {
    let classifier = StubClassifier::new(&DERMNET_21_PROFILE, one_hot(21, 10));
    let app = create_app(build_state(
        &DERMNET_21_PROFILE,
        ImageSourceKind::Upload,
        classifier.clone(),
        true,
    ));

    let request = multipart_request("image", "lesion.png", &png_bytes(224, 224, [255, 0, 0]));
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({ "prediction": "Melanoma" }));
    assert_eq!(classifier.calls(), 1);
}

#[tokio::test]
async fn test_upload_v1_first_label() {
    let classifier = StubClassifier::new(&SKINLENS_V1_PROFILE, one_hot(8, 0));
    let app = create_app(build_state(
        &SKINLENS_V1_PROFILE,
        ImageSourceKind::Upload,
        classifier,
        true,
    ));

    let request = multipart_request("image", "lesion.jpg", &jpeg_bytes(640, 480, [90, 60, 40]));
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["prediction"], SKINLENS_V1_PROFILE.labels.label(0));
}

#[tokio::test]
async fn test_upload_is_resized_to_profile_resolution() {
    let classifier = StubClassifier::new(&SKINLENS_V2_PROFILE, one_hot(8, 3));
    let app = create_app(build_state(
        &SKINLENS_V2_PROFILE,
        ImageSourceKind::Upload,
        classifier.clone(),
        true,
    ));

    let request = multipart_request("image", "tiny.png", &png_bytes(17, 999, [10, 20, 30]));
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let input = classifier.last_input().expect("classifier should have been called");
    assert_eq!(input.shape(), &[1, 150, 150, 3]);
    // Raw scaling keeps pixel values in 0..=255
    assert_eq!(input[[0, 75, 75, 0]], 10.0);
    assert_eq!(input[[0, 75, 75, 2]], 30.0);
}

#[tokio::test]
async fn test_upload_unit_interval_scaling() {
    let classifier = StubClassifier::new(&DERMNET_21_PROFILE, one_hot(21, 0));
    let app = create_app(build_state(
        &DERMNET_21_PROFILE,
        ImageSourceKind::Upload,
        classifier.clone(),
        true,
    ));

    let request = multipart_request("image", "white.png", &png_bytes(40, 40, [255, 255, 255]));
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let input = classifier.last_input().unwrap();
    assert_eq!(input.shape(), &[1, 224, 224, 3]);
    assert!(input.iter().all(|v| (*v - 1.0).abs() < 1e-6));
}

#[tokio::test]
async fn test_missing_image_field_is_400() {
    let classifier = StubClassifier::new(&SKINLENS_V1_PROFILE, one_hot(8, 0));
    let app = create_app(build_state(
        &SKINLENS_V1_PROFILE,
        ImageSourceKind::Upload,
        classifier.clone(),
        true,
    ));

    let request = multipart_request("file", "lesion.png", &png_bytes(10, 10, [0, 0, 0]));
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await, json!({ "error": "No image uploaded" }));
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_json_body_in_upload_mode_is_400() {
    let classifier = StubClassifier::new(&SKINLENS_V1_PROFILE, one_hot(8, 0));
    let app = create_app(build_state(
        &SKINLENS_V1_PROFILE,
        ImageSourceKind::Upload,
        classifier.clone(),
        true,
    ));

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"imageUrl":"https://example.com/a.png"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"], "No image uploaded");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_undecodable_upload_is_500() {
    let classifier = StubClassifier::new(&SKINLENS_V1_PROFILE, one_hot(8, 0));
    let app = create_app(build_state(
        &SKINLENS_V1_PROFILE,
        ImageSourceKind::Upload,
        classifier.clone(),
        true,
    ));

    let request = multipart_request("image", "notes.txt", b"this is not an image at all");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert!(body["error"].is_string());
    assert_eq!(body.as_object().unwrap().len(), 1);
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_classifier_failure_is_500() {
    let classifier = StubClassifier::failing(&SKINLENS_V1_PROFILE, "session exploded");
    let app = create_app(build_state(
        &SKINLENS_V1_PROFILE,
        ImageSourceKind::Upload,
        classifier.clone(),
        true,
    ));

    let request = multipart_request("image", "lesion.png", &png_bytes(150, 150, [1, 2, 3]));
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("session exploded"));
    assert_eq!(classifier.calls(), 1);
}

#[tokio::test]
async fn test_out_of_range_index_is_unknown() {
    // 21 scores against an 8-label table, arg-max beyond the table
    let classifier = StubClassifier::new(&SKINLENS_V1_PROFILE, one_hot(21, 15));
    let app = create_app(build_state(
        &SKINLENS_V1_PROFILE,
        ImageSourceKind::Upload,
        classifier,
        true,
    ));

    let request = multipart_request("image", "lesion.png", &png_bytes(150, 150, [1, 2, 3]));
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({ "prediction": "Unknown" }));
}

#[tokio::test]
async fn test_identical_uploads_give_identical_predictions() {
    let classifier = StubClassifier::new(&DERMNET_21_PROFILE, one_hot(21, 4));
    let state = build_state(&DERMNET_21_PROFILE, ImageSourceKind::Upload, classifier, true);
    let image = png_bytes(300, 200, [80, 120, 160]);

    let first = create_app(state.clone())
        .oneshot(multipart_request("image", "a.png", &image))
        .await
        .unwrap();
    let second = create_app(state)
        .oneshot(multipart_request("image", "a.png", &image))
        .await
        .unwrap();

    assert_eq!(response_json(first).await, response_json(second).await);
}
