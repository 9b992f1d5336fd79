// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image classification for skin lesion photos
//!
//! This module provides:
//! - Image decoding and validation
//! - Resize and tensor preparation per model profile
//! - ONNX classifier inference on CPU
//! - Label lookup for the arg-max class

pub mod classifier;
pub mod image_utils;
pub mod labels;
pub mod model_store;
pub mod pipeline;
pub mod preprocessing;
pub mod profile;

pub use classifier::{Classifier, ClassifierError, OnnxClassifier};
pub use image_utils::{decode_image_bytes, sniff_format, ImageError, ImageInfo, MAX_IMAGE_SIZE};
pub use labels::{argmax, LabelTable, UNKNOWN_LABEL};
pub use model_store::{ensure_model, ModelSource};
pub use pipeline::{InferencePipeline, PipelineError, Prediction};
pub use preprocessing::preprocess;
pub use profile::{ChannelOrder, ModelProfile, PixelScaling, ProfileError, PROFILES};
