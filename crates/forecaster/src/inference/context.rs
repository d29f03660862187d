use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::de::DeserializeOwned;
use skycast_core::Scaler;

use super::{
    ForecastError, Horizon, HorizonPredictor, LagFeatureBuilder, ModelArtifact, ObservationWindow,
    ScalerPair, Target,
};

/// Everything needed to forecast one target
#[derive(Debug)]
pub struct TargetPipeline {
    target: Target,
    builder: LagFeatureBuilder,
    scalers: ScalerPair,
    predictor: Box<dyn HorizonPredictor>,
}

impl TargetPipeline {
    /// Checks that the scalers and the model agree with the target's feature schema
    pub fn new(
        target: Target,
        scalers: ScalerPair,
        predictor: Box<dyn HorizonPredictor>,
    ) -> Result<Self, ForecastError> {
        let builder = target.feature_builder();
        let names = builder.feature_names();
        if scalers.input().feature_names != names {
            return Err(ForecastError::SchemaMismatch(format!(
                "{} input scaler was fit on {:?}, pipeline builds {:?}",
                target,
                scalers.input().feature_names,
                names
            )));
        }
        if predictor.n_features() != builder.width() {
            return Err(ForecastError::SchemaMismatch(format!(
                "{} model expects {} features, pipeline builds {}",
                target,
                predictor.n_features(),
                builder.width()
            )));
        }
        Ok(Self {
            target,
            builder,
            scalers,
            predictor,
        })
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn min_history(&self) -> usize {
        self.builder.min_history()
    }

    /// Physical horizon, before clamping and rounding
    pub fn forecast(&self, window: &ObservationWindow) -> Result<Horizon, ForecastError> {
        let row = self.builder.build(window)?;
        let normalized = self.scalers.transform(&row)?;
        let predicted = self.predictor.predict(&normalized)?;
        let physical = self.scalers.inverse_transform(&predicted)?;
        if physical.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidPrediction(self.target));
        }
        debug!("{} horizon for {}: {:?}", self.target, window.location(), physical);
        Ok(physical)
    }
}

/// Read-only models and scalers for every target, built once at startup
#[derive(Debug)]
pub struct ModelContext {
    /// Indexed by [`Target::index`]
    pipelines: Vec<TargetPipeline>,
}

impl ModelContext {
    pub fn new(mut pipelines: Vec<TargetPipeline>) -> Result<Self, ForecastError> {
        pipelines.sort_by_key(|p| p.target());
        let targets: Vec<Target> = pipelines.iter().map(TargetPipeline::target).collect();
        if targets != Target::ALL {
            return Err(ForecastError::Artifact(format!(
                "expected one pipeline per target {:?}, found {:?}",
                Target::ALL,
                targets
            )));
        }
        Ok(Self { pipelines })
    }

    /// Loads `models/<stem>_model.json` and `scalers/{x,y}_scaler_<stem>.json`
    /// for every target under `model_dir`
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let model_dir = model_dir.as_ref();
        let pipelines = Target::ALL
            .iter()
            .map(|target| load_pipeline(model_dir, *target))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "loaded {} forecast models from {}",
            pipelines.len(),
            model_dir.display()
        );
        Self::new(pipelines)
    }

    pub fn pipelines(&self) -> &[TargetPipeline] {
        &self.pipelines
    }

    pub fn pipeline(&self, target: Target) -> &TargetPipeline {
        &self.pipelines[target.index()]
    }

    /// Longest history any target needs
    pub fn min_history(&self) -> usize {
        self.pipelines
            .iter()
            .map(TargetPipeline::min_history)
            .max()
            .unwrap_or(1)
    }
}

pub fn model_path(model_dir: &Path, target: Target) -> PathBuf {
    model_dir
        .join("models")
        .join(format!("{}_model.json", target.artifact_stem()))
}

pub fn input_scaler_path(model_dir: &Path, target: Target) -> PathBuf {
    model_dir
        .join("scalers")
        .join(format!("x_scaler_{}.json", target.artifact_stem()))
}

pub fn output_scaler_path(model_dir: &Path, target: Target) -> PathBuf {
    model_dir
        .join("scalers")
        .join(format!("y_scaler_{}.json", target.artifact_stem()))
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ForecastError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ForecastError::Artifact(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| ForecastError::Artifact(format!("{}: {}", path.display(), e)))
}

fn load_pipeline(model_dir: &Path, target: Target) -> Result<TargetPipeline, ForecastError> {
    let input: Scaler = read_artifact(&input_scaler_path(model_dir, target))?;
    let output: Scaler = read_artifact(&output_scaler_path(model_dir, target))?;
    let model: ModelArtifact = read_artifact(&model_path(model_dir, target))?;
    debug!("loaded {} artifacts", target);
    TargetPipeline::new(
        target,
        ScalerPair::new(input, output)?,
        model.into_predictor()?,
    )
}
