//! Fitted, frozen feature scalers
//!
//! Scalers are fit offline and shipped as JSON artifacts. At runtime they are
//! read-only: `transform` normalizes a row into the space a model was trained
//! in and `inverse_transform` maps model output back to physical units.
//!
//! ```json
//! { "kind": "standard", "feature_names": ["snowfall", "precipitation"],
//!   "mean": [0.1, 0.3], "scale": [0.5, 0.9] }
//! ```

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScalerError {
    #[error("schema mismatch: scaler was fit on {expected:?} but received {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("width mismatch: scaler expects {expected} values but received {found}")]
    WidthMismatch { expected: usize, found: usize },
    #[error("invalid scaler parameters: {0}")]
    InvalidParameters(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    /// Column names, in the order the scaler was fit with
    pub feature_names: Vec<String>,
    #[serde(flatten)]
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// Maps `[data_min, data_max]` onto `feature_range`
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "unit_range")]
        feature_range: (f64, f64),
    },
    /// Maps each feature through its empirical quantiles onto a uniform [0, 1]
    /// distribution. `quantiles[feature]` is non-decreasing; the matching
    /// references are evenly spaced over [0, 1].
    Quantile { quantiles: Vec<Vec<f64>> },
}

fn unit_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl Scaler {
    pub fn new(feature_names: Vec<String>, transform: Transform) -> Result<Self, ScalerError> {
        let scaler = Self {
            feature_names,
            transform,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Standard scaler, mostly useful for building fixtures
    pub fn standard(
        feature_names: &[&str],
        mean: Vec<f64>,
        scale: Vec<f64>,
    ) -> Result<Self, ScalerError> {
        Self::new(
            feature_names.iter().map(|n| n.to_string()).collect(),
            Transform::Standard { mean, scale },
        )
    }

    pub fn width(&self) -> usize {
        self.feature_names.len()
    }

    pub fn validate(&self) -> Result<(), ScalerError> {
        let width = self.width();
        if width == 0 {
            return Err(ScalerError::InvalidParameters(
                "scaler has no features".to_string(),
            ));
        }

        match &self.transform {
            Transform::Standard { mean, scale } => {
                check_len("mean", mean.len(), width)?;
                check_len("scale", scale.len(), width)?;
                check_finite("mean", mean)?;
                check_finite("scale", scale)?;
                if let Some(idx) = scale.iter().position(|s| *s == 0.0) {
                    return Err(ScalerError::InvalidParameters(format!(
                        "scale of `{}` is zero",
                        self.feature_names[idx]
                    )));
                }
            }
            Transform::MinMax {
                data_min,
                data_max,
                feature_range,
            } => {
                check_len("data_min", data_min.len(), width)?;
                check_len("data_max", data_max.len(), width)?;
                check_finite("data_min", data_min)?;
                check_finite("data_max", data_max)?;
                if !(feature_range.0 < feature_range.1) {
                    return Err(ScalerError::InvalidParameters(format!(
                        "feature_range {:?} is empty",
                        feature_range
                    )));
                }
            }
            Transform::Quantile { quantiles } => {
                check_len("quantiles", quantiles.len(), width)?;
                for (name, column) in self.feature_names.iter().zip(quantiles) {
                    if column.len() < 2 {
                        return Err(ScalerError::InvalidParameters(format!(
                            "`{}` needs at least two quantiles",
                            name
                        )));
                    }
                    check_finite("quantiles", column)?;
                    if column.windows(2).any(|w| w[1] < w[0]) {
                        return Err(ScalerError::InvalidParameters(format!(
                            "quantiles of `{}` are not sorted",
                            name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Normalize a row whose column names are known, rejecting any difference
    /// in field set or order against the fitted schema.
    pub fn transform_named<S: AsRef<str>>(
        &self,
        names: &[S],
        values: &[f64],
    ) -> Result<Vec<f64>, ScalerError> {
        let matches = names.len() == self.feature_names.len()
            && names
                .iter()
                .zip(&self.feature_names)
                .all(|(found, expected)| found.as_ref() == expected);
        if !matches {
            return Err(ScalerError::SchemaMismatch {
                expected: self.feature_names.clone(),
                found: names.iter().map(|n| n.as_ref().to_string()).collect(),
            });
        }
        self.transform(values)
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, ScalerError> {
        self.check_width(values)?;
        let out = match &self.transform {
            Transform::Standard { mean, scale } => values
                .iter()
                .enumerate()
                .map(|(i, x)| (x - mean[i]) / scale[i])
                .collect(),
            Transform::MinMax {
                data_min,
                data_max,
                feature_range,
            } => values
                .iter()
                .enumerate()
                .map(|(i, x)| {
                    let (scale, min) = min_max_params(data_min[i], data_max[i], *feature_range);
                    x * scale + min
                })
                .collect(),
            Transform::Quantile { quantiles } => values
                .iter()
                .zip(quantiles)
                .map(|(x, q)| quantile_forward(*x, q))
                .collect(),
        };
        Ok(out)
    }

    pub fn inverse_transform(&self, values: &[f64]) -> Result<Vec<f64>, ScalerError> {
        self.check_width(values)?;
        let out = match &self.transform {
            Transform::Standard { mean, scale } => values
                .iter()
                .enumerate()
                .map(|(i, x)| x * scale[i] + mean[i])
                .collect(),
            Transform::MinMax {
                data_min,
                data_max,
                feature_range,
            } => values
                .iter()
                .enumerate()
                .map(|(i, x)| {
                    let (scale, min) = min_max_params(data_min[i], data_max[i], *feature_range);
                    (x - min) / scale
                })
                .collect(),
            Transform::Quantile { quantiles } => values
                .iter()
                .zip(quantiles)
                .map(|(y, q)| {
                    let references = references(q.len());
                    interp(y.clamp(0.0, 1.0), &references, q)
                })
                .collect(),
        };
        Ok(out)
    }

    fn check_width(&self, values: &[f64]) -> Result<(), ScalerError> {
        if values.len() != self.width() {
            return Err(ScalerError::WidthMismatch {
                expected: self.width(),
                found: values.len(),
            });
        }
        Ok(())
    }
}

fn check_len(field: &str, len: usize, width: usize) -> Result<(), ScalerError> {
    if len != width {
        return Err(ScalerError::InvalidParameters(format!(
            "`{}` has {} entries for {} features",
            field, len, width
        )));
    }
    Ok(())
}

fn check_finite(field: &str, values: &[f64]) -> Result<(), ScalerError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ScalerError::InvalidParameters(format!(
            "`{}` contains a non-finite value",
            field
        )));
    }
    Ok(())
}

/// Constant features get a unit data range, the same way they were treated at fit time.
fn min_max_params(data_min: f64, data_max: f64, feature_range: (f64, f64)) -> (f64, f64) {
    let mut data_range = data_max - data_min;
    if data_range == 0.0 {
        data_range = 1.0;
    }
    let scale = (feature_range.1 - feature_range.0) / data_range;
    (scale, feature_range.0 - data_min * scale)
}

fn references(n: usize) -> Vec<f64> {
    let last = (n - 1) as f64;
    (0..n).map(|k| k as f64 / last).collect()
}

/// Averages the left- and right-most interpolations so flat quantile runs map
/// to the middle of their reference span.
fn quantile_forward(x: f64, quantiles: &[f64]) -> f64 {
    let n = quantiles.len();
    if x <= quantiles[0] {
        return 0.0;
    }
    if x >= quantiles[n - 1] {
        return 1.0;
    }
    let references = references(n);
    let neg_q: Vec<f64> = quantiles.iter().rev().map(|q| -q).collect();
    let neg_r: Vec<f64> = references.iter().rev().map(|r| -r).collect();
    0.5 * (interp(x, quantiles, &references) - interp(-x, &neg_q, &neg_r))
}

/// Piecewise-linear interpolation over non-decreasing `xp`, clamped at both ends.
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len();
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // largest j with xp[j] <= x; xp[j + 1] > x so the span is non-empty
    let j = xp.partition_point(|v| *v <= x) - 1;
    let t = (x - xp[j]) / (xp[j + 1] - xp[j]);
    fp[j] + t * (fp[j + 1] - fp[j])
}
