// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end image classification: bytes in, label out

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::classifier::{Classifier, ClassifierError};
use super::image_utils::{decode_image_bytes, ImageError};
use super::labels::argmax;
use super::preprocessing::preprocess;
use super::profile::ModelProfile;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] ImageError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Classifier returned no usable probabilities")]
    EmptyOutput,
}

/// Result of one classification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub label: String,
    pub class_index: usize,
    pub confidence: f32,
    pub processing_time_ms: u64,
}

/// A classifier paired with the profile it was released with
///
/// Built once at startup and shared read-only by every request.
#[derive(Clone)]
pub struct InferencePipeline {
    classifier: Arc<dyn Classifier>,
    profile: &'static ModelProfile,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("classifier", &self.classifier.name())
            .field("profile", &self.profile.name)
            .finish()
    }
}

impl InferencePipeline {
    pub fn new(classifier: Arc<dyn Classifier>, profile: &'static ModelProfile) -> Self {
        Self {
            classifier,
            profile,
        }
    }

    pub fn profile(&self) -> &'static ModelProfile {
        self.profile
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Decode, preprocess, classify and label one encoded image
    ///
    /// This is CPU-bound; call it from a blocking task.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Prediction, PipelineError> {
        let start = Instant::now();

        let (image, info) = decode_image_bytes(bytes)?;
        debug!(
            "Decoded image: {}x{} {:?}, {} bytes",
            info.width, info.height, info.format, info.size_bytes
        );

        let tensor = preprocess(&image, self.profile);
        let probabilities = self.classifier.predict(&tensor)?;

        if probabilities.len() != self.profile.num_classes() {
            warn!(
                "Classifier '{}' returned {} scores but profile '{}' has {} labels",
                self.classifier.name(),
                probabilities.len(),
                self.profile.name,
                self.profile.num_classes()
            );
        }

        let class_index = argmax(&probabilities).ok_or(PipelineError::EmptyOutput)?;
        let label = self.profile.labels.label(class_index);

        Ok(Prediction {
            label: label.to_string(),
            class_index,
            confidence: probabilities[class_index],
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
