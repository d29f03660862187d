//! Pre-trained multi-output regressors
//!
//! Each target owns one predictor mapping a normalized feature row onto a
//! normalized [`Horizon`]. Predictors hold frozen parameters only, so a single
//! instance is shared by every request.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::{ForecastError, Horizon, HORIZON};

pub trait HorizonPredictor: Debug + Send + Sync {
    /// Width of the feature row the model was trained on
    fn n_features(&self) -> usize;

    fn predict(&self, features: &[f64]) -> Result<Horizon, ForecastError>;
}

/// Predictor artifact as exported by the training job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    Mlp(MlpModel),
}

impl ModelArtifact {
    pub fn into_predictor(self) -> Result<Box<dyn HorizonPredictor>, ForecastError> {
        match self {
            ModelArtifact::Linear(model) => {
                model.validate()?;
                Ok(Box::new(model))
            }
            ModelArtifact::Mlp(model) => {
                model.validate()?;
                Ok(Box::new(model))
            }
        }
    }
}

fn check_width(expected: usize, features: &[f64]) -> Result<(), ForecastError> {
    if features.len() != expected {
        return Err(ForecastError::SchemaMismatch(format!(
            "model expects {} features but received {}",
            expected,
            features.len()
        )));
    }
    Ok(())
}

fn to_horizon(values: Vec<f64>) -> Result<Horizon, ForecastError> {
    values.try_into().map_err(|values: Vec<f64>| {
        ForecastError::SchemaMismatch(format!(
            "model produced {} steps, expected {}",
            values.len(),
            HORIZON
        ))
    })
}

/// One linear regression per horizon step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// `coefficients[step][feature]`
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearModel {
    pub fn new(coefficients: Vec<Vec<f64>>, intercepts: Vec<f64>) -> Result<Self, ForecastError> {
        let model = Self {
            coefficients,
            intercepts,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ForecastError> {
        if self.coefficients.len() != HORIZON || self.intercepts.len() != HORIZON {
            return Err(ForecastError::Artifact(format!(
                "linear model must have {} coefficient rows and intercepts, found {} and {}",
                HORIZON,
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        let width = self.n_features();
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err(ForecastError::Artifact(
                "linear model coefficient rows differ in width".to_string(),
            ));
        }
        let finite = self
            .coefficients
            .iter()
            .flatten()
            .chain(&self.intercepts)
            .all(|v| v.is_finite());
        if !finite {
            return Err(ForecastError::Artifact(
                "linear model has non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }
}

impl HorizonPredictor for LinearModel {
    fn n_features(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    fn predict(&self, features: &[f64]) -> Result<Horizon, ForecastError> {
        check_width(self.n_features(), features)?;
        let steps = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, intercept)| {
                row.iter()
                    .zip(features)
                    .fold(*intercept, |acc, (w, x)| acc + w * x)
            })
            .collect();
        to_horizon(steps)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Logistic,
    Identity,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Logistic => 1.0 / (1.0 + (-x).exp()),
            Activation::Identity => x,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `weights[input][output]`
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.len()
    }

    fn outputs(&self) -> usize {
        self.biases.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.biases.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (acc, w) in out.iter_mut().zip(row) {
                *acc += x * w;
            }
        }
        out
    }
}

/// Feed-forward network; hidden layers use `activation`, the output layer is linear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpModel {
    pub layers: Vec<DenseLayer>,
    #[serde(default)]
    pub activation: Activation,
}

impl MlpModel {
    fn validate(&self) -> Result<(), ForecastError> {
        let Some(last) = self.layers.last() else {
            return Err(ForecastError::Artifact("mlp model has no layers".to_string()));
        };
        if last.outputs() != HORIZON {
            return Err(ForecastError::Artifact(format!(
                "mlp output layer has {} units, expected {}",
                last.outputs(),
                HORIZON
            )));
        }
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.weights.iter().any(|row| row.len() != layer.outputs()) {
                return Err(ForecastError::Artifact(format!(
                    "mlp layer {} weights do not match its {} biases",
                    index,
                    layer.outputs()
                )));
            }
            if index > 0 && layer.inputs() != self.layers[index - 1].outputs() {
                return Err(ForecastError::Artifact(format!(
                    "mlp layer {} expects {} inputs but layer {} has {} outputs",
                    index,
                    layer.inputs(),
                    index - 1,
                    self.layers[index - 1].outputs()
                )));
            }
            let finite = layer
                .weights
                .iter()
                .flatten()
                .chain(&layer.biases)
                .all(|v| v.is_finite());
            if !finite {
                return Err(ForecastError::Artifact(format!(
                    "mlp layer {index} has non-finite parameters"
                )));
            }
        }
        Ok(())
    }
}

impl HorizonPredictor for MlpModel {
    fn n_features(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    fn predict(&self, features: &[f64]) -> Result<Horizon, ForecastError> {
        check_width(self.n_features(), features)?;
        let hidden = self.layers.len().saturating_sub(1);
        let mut activations = features.to_vec();
        for (index, layer) in self.layers.iter().enumerate() {
            activations = layer.forward(&activations);
            if index < hidden {
                activations
                    .iter_mut()
                    .for_each(|x| *x = self.activation.apply(*x));
            }
        }
        to_horizon(activations)
    }
}
