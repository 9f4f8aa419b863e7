//! Win-probability scorers.
//!
//! The battle classifier is trained offline and exported as a stack of dense
//! layers; [`DenseNetwork`] replays that forward pass. Anything else that maps a
//! [`FeatureVector`] to a probability can stand in through [`Predictor`].

use crate::features::{FeatureVector, FEATURE_COUNT};
use anyhow::Context;
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("expected {expected} input features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("model produced {0} outputs, expected a single score")]
    OutputShape(usize),
}

/// Probability that the first Pokemon in the vector wins.
pub trait Predictor: Send + Sync {
    fn score(&self, features: &FeatureVector) -> Result<f32, PredictorError>;

    fn name(&self) -> &str {
        "predictor"
    }
}

impl<F> Predictor for F
where
    F: Fn(&FeatureVector) -> f32 + Send + Sync,
{
    fn score(&self, features: &FeatureVector) -> Result<f32, PredictorError> {
        Ok(self(features))
    }

    fn name(&self) -> &str {
        "fn"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LayerFile {
    kernel: Vec<Vec<f32>>,
    bias: Vec<f32>,
    #[serde(default = "default_activation")]
    activation: Activation,
}

fn default_activation() -> Activation {
    Activation::Linear
}

#[derive(Debug, Deserialize)]
struct NetworkFile {
    layers: Vec<LayerFile>,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    // [inputs, units], same layout as a Keras Dense kernel.
    kernel: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &Array1<f32>) -> Array1<f32> {
        let mut out = input.dot(&self.kernel) + &self.bias;
        out.mapv_inplace(|x| self.activation.apply(x));
        out
    }
}

/// Feed-forward classifier exported from the trained Keras model.
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file at {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to load model from {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let parsed: NetworkFile =
            serde_json::from_str(raw).context("Model file is not a valid layer list")?;
        if parsed.layers.is_empty() {
            anyhow::bail!("Model has no layers");
        }

        let mut layers = Vec::with_capacity(parsed.layers.len());
        let mut expected_inputs = FEATURE_COUNT;
        for (idx, layer) in parsed.layers.into_iter().enumerate() {
            let inputs = layer.kernel.len();
            if inputs != expected_inputs {
                anyhow::bail!("Layer {idx} expects {inputs} inputs, previous layer provides {expected_inputs}");
            }
            let units = layer.bias.len();
            if units == 0 {
                anyhow::bail!("Layer {idx} has no units");
            }
            if let Some(row) = layer.kernel.iter().position(|row| row.len() != units) {
                anyhow::bail!("Layer {idx} kernel row {row} does not have {units} columns");
            }
            let flat: Vec<f32> = layer.kernel.into_iter().flatten().collect();
            let kernel = Array2::from_shape_vec((inputs, units), flat)
                .with_context(|| format!("Layer {idx} kernel has an invalid shape"))?;
            layers.push(DenseLayer {
                kernel,
                bias: Array1::from(layer.bias),
                activation: layer.activation,
            });
            expected_inputs = units;
        }
        if expected_inputs != 1 {
            anyhow::bail!("Final layer must have a single unit, found {expected_inputs}");
        }
        Ok(DenseNetwork { layers })
    }

    /// Units per layer, e.g. `[64, 32, 1]`.
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(|l| l.bias.len()).collect()
    }
}

impl Predictor for DenseNetwork {
    fn score(&self, features: &FeatureVector) -> Result<f32, PredictorError> {
        let values = features.as_slice();
        if values.len() != FEATURE_COUNT {
            return Err(PredictorError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }
        let mut activations = Array1::from(values.to_vec());
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        match activations.len() {
            1 => Ok(activations[0]),
            n => Err(PredictorError::OutputShape(n)),
        }
    }

    fn name(&self) -> &str {
        "dense"
    }
}
