use anyhow::{anyhow, Context, Error};
use serde::Deserialize;
use skycast_core::Scaler;
use std::{fs, path::Path};

/// Columns the clustering model was fit on, in order
pub const CLUSTER_FEATURES: [&str; 4] = ["temperature_2m", "precipitation", "rain", "showers"];

/// Pre-fitted weather-regime clustering: a scaler plus one centroid per cluster.
/// A row's label is the index of the nearest centroid in scaled space.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterModel {
    scaler: Scaler,
    centroids: Vec<Vec<f64>>,
}

impl ClusterModel {
    pub fn new(scaler: Scaler, centroids: Vec<Vec<f64>>) -> Result<Self, Error> {
        let model = Self { scaler, centroids };
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read cluster model {}", path.display()))?;
        let model: ClusterModel = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse cluster model {}", path.display()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), Error> {
        self.scaler.validate()?;
        if self.scaler.feature_names != CLUSTER_FEATURES {
            return Err(anyhow!(
                "cluster scaler was fit on {:?}, expected {:?}",
                self.scaler.feature_names,
                CLUSTER_FEATURES
            ));
        }
        if self.centroids.is_empty() {
            return Err(anyhow!("cluster model has no centroids"));
        }
        if let Some(bad) = self
            .centroids
            .iter()
            .position(|c| c.len() != CLUSTER_FEATURES.len())
        {
            return Err(anyhow!("centroid {} has the wrong width", bad));
        }
        Ok(())
    }

    pub fn num_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// `values` follow `CLUSTER_FEATURES` order. Ties go to the lowest label.
    pub fn assign(&self, values: &[f64; 4]) -> Result<i64, Error> {
        let scaled = self.scaler.transform_named(&CLUSTER_FEATURES, values)?;
        let mut best = (0usize, f64::INFINITY);
        for (label, centroid) in self.centroids.iter().enumerate() {
            let distance: f64 = scaled
                .iter()
                .zip(centroid)
                .map(|(x, c)| (x - c).powi(2))
                .sum();
            if distance < best.1 {
                best = (label, distance);
            }
        }
        Ok(best.0 as i64)
    }
}
