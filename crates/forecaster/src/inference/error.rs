use skycast_core::ScalerError;

use super::Target;

#[derive(thiserror::Error, Debug)]
pub enum ForecastError {
    #[error("unknown location: {0}")]
    UnknownLocation(String),
    #[error("insufficient history: need at least {required} observations, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error(
        "no condition matches precipitation={precipitation}, snowfall={snowfall}, cloud_cover={cloud_cover}"
    )]
    UndefinedCondition {
        precipitation: f64,
        snowfall: f64,
        cloud_cover: f64,
    },
    #[error("failed to fetch observations: {0}")]
    UpstreamFetchFailure(String),
    #[error("observation at {observed_at} has an out-of-range `{field}`")]
    InvalidObservation {
        observed_at: String,
        field: &'static str,
    },
    #[error("observation {index} is not later than the one before it")]
    UnorderedWindow { index: usize },
    #[error("{0} model produced a non-finite prediction")]
    InvalidPrediction(Target),
    #[error("failed to load model artifacts: {0}")]
    Artifact(String),
}

impl ForecastError {
    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            ForecastError::UnknownLocation(_) => "unknown_location",
            ForecastError::InsufficientHistory { .. } => "insufficient_history",
            ForecastError::SchemaMismatch(_) => "schema_mismatch",
            ForecastError::UndefinedCondition { .. } => "undefined_condition",
            ForecastError::UpstreamFetchFailure(_) => "upstream_fetch_failure",
            ForecastError::InvalidObservation { .. } => "invalid_observation",
            ForecastError::UnorderedWindow { .. } => "unordered_window",
            ForecastError::InvalidPrediction(_) => "invalid_prediction",
            ForecastError::Artifact(_) => "artifact",
        }
    }

    /// Errors the caller can fix or retry, as opposed to model/config/data faults
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::UnknownLocation(_) | ForecastError::InsufficientHistory { .. }
        )
    }
}

impl From<ScalerError> for ForecastError {
    fn from(err: ScalerError) -> Self {
        match err {
            ScalerError::InvalidParameters(_) => ForecastError::Artifact(err.to_string()),
            ScalerError::SchemaMismatch { .. } | ScalerError::WidthMismatch { .. } => {
                ForecastError::SchemaMismatch(err.to_string())
            }
        }
    }
}
