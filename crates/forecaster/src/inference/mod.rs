//! Lagged-feature, multi-horizon inference
//!
//! A window of recent observations flows through one pipeline per target:
//! lag features are built, normalized, predicted five hours ahead and mapped
//! back to physical units. [`Forecaster`] then clamps, rounds and categorizes
//! the horizons alongside the current observation.

mod categorize;
mod context;
mod error;
mod features;
mod forecast;
mod observation;
mod predictor;
mod scaler_pair;
mod target;

pub use categorize::{categorize, Condition, CLOUD_COVER_THRESHOLD};
pub use context::{input_scaler_path, model_path, output_scaler_path, ModelContext, TargetPipeline};
pub use error::ForecastError;
pub use features::{FeatureRow, LagFeatureBuilder};
pub use forecast::{ForecastResult, Forecaster, Snapshot};
pub use observation::{Column, Observation, ObservationWindow};
pub use predictor::{Activation, DenseLayer, HorizonPredictor, LinearModel, MlpModel, ModelArtifact};
pub use scaler_pair::ScalerPair;
pub use target::{round_to, Target};

/// Hourly steps each model predicts
pub const HORIZON: usize = 5;

/// One value per future hour, `[t+1, .., t+5]`
pub type Horizon = [f64; HORIZON];
