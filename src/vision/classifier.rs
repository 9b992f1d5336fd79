// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Classifier abstraction and the ONNX Runtime implementation
//!
//! The trained model is treated as an opaque function from a fixed-shape
//! pixel tensor to a probability vector. It is loaded once at startup and
//! shared read-only across requests.

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifierError {
    #[error("Input shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// A trained model mapping an input tensor to per-class probabilities
pub trait Classifier: Send + Sync {
    /// Run a forward pass on a batch-of-one tensor
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError>;

    /// Human-readable model identifier for logs and health output
    fn name(&self) -> &str;
}

/// ONNX Runtime classifier, CPU only
#[derive(Clone)]
pub struct OnnxClassifier {
    /// ONNX Runtime session (run() needs &mut)
    session: Arc<Mutex<Session>>,
    input_name: String,
    /// Expected NHWC input shape
    input_shape: [usize; 4],
    name: String,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .field("input_shape", &self.input_shape)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load a classifier from an ONNX file
    ///
    /// # Arguments
    /// - `model_path`: path to the exported model (e.g. `skinlensAI.onnx`)
    /// - `input_shape`: NHWC shape the model was trained on
    /// - `intra_threads`: ONNX Runtime intra-op thread count
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime cannot build a
    /// session from it.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_shape: [usize; 4],
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Classifier model not found: {}", model_path.display());
        }

        info!("Loading classifier from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads.max(1))
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load classifier from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("Classifier model declares no inputs")?;

        if let Some(input) = session.inputs.first() {
            debug!("Classifier input '{}': {:?}", input_name, input.input_type);
        }

        let name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("classifier")
            .to_string();

        info!("✅ Classifier '{}' loaded (CPU-only)", name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            input_shape,
            name,
        })
    }

    pub fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }
}

/// Reject tensors whose shape differs from the expected one
pub fn check_shape(input: &Array4<f32>, expected: [usize; 4]) -> Result<(), ClassifierError> {
    if input.shape() != &expected[..] {
        return Err(ClassifierError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: input.shape().to_vec(),
        });
    }
    Ok(())
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        check_shape(input, self.input_shape)?;

        let input_value = Value::from_array(input.to_owned())
            .map_err(|e| ClassifierError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("classifier session poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        // Output is [1, num_classes]; flatten to the probability vector
        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        debug!("Classifier output shape: {:?}", output_tensor.shape());

        Ok(output_tensor.iter().copied().collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
