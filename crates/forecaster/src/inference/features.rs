use log::debug;

use super::{Column, ForecastError, ObservationWindow};

/// Builds one model input row from the newest observation and its predecessors.
///
/// The row holds every base column of the anchor (last) observation, followed by
/// the same columns for each of the `lags` observations before it, named
/// `<column>_lag_<k>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagFeatureBuilder {
    columns: &'static [Column],
    lags: usize,
}

/// Named, ordered model input
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureRow {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl LagFeatureBuilder {
    pub const fn new(columns: &'static [Column], lags: usize) -> Self {
        Self { columns, lags }
    }

    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    /// Observations needed to fill every lag
    pub fn min_history(&self) -> usize {
        self.lags + 1
    }

    pub fn width(&self) -> usize {
        self.columns.len() * (self.lags + 1)
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        names.extend(self.columns.iter().map(|c| c.name().to_owned()));
        for lag in 1..=self.lags {
            names.extend(
                self.columns
                    .iter()
                    .map(|c| format!("{}_lag_{}", c.name(), lag)),
            );
        }
        names
    }

    pub fn build(&self, window: &ObservationWindow) -> Result<FeatureRow, ForecastError> {
        let observations = window.observations();
        if observations.len() < self.min_history() {
            return Err(ForecastError::InsufficientHistory {
                required: self.min_history(),
                actual: observations.len(),
            });
        }

        let anchor = observations.len() - 1;
        let mut values = Vec::with_capacity(self.width());
        for lag in 0..=self.lags {
            let observation = &observations[anchor - lag];
            values.extend(self.columns.iter().map(|c| c.value(observation)));
        }
        debug!(
            "built {} features with {} lags from {} observations for {}",
            values.len(),
            self.lags,
            observations.len(),
            window.location()
        );

        Ok(FeatureRow {
            names: self.feature_names(),
            values,
        })
    }
}
