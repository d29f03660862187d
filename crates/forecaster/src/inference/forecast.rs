use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use utoipa::ToSchema;

use super::{
    categorize, round_to, Condition, ForecastError, Horizon, ModelContext, Observation,
    ObservationWindow, Target, HORIZON,
};

/// One resolved weather state, current or forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Snapshot {
    /// Degrees Celsius
    pub temperature: i64,
    /// Only known for the current observation
    pub feels_like: Option<i64>,
    /// mm over the hour
    pub precipitation: f64,
    /// cm over the hour
    pub snowfall: f64,
    /// km/h at 10 m
    pub windspeed: f64,
    /// Only known for the current observation
    pub humidity: Option<i64>,
    /// Surface pressure in hPa, only known for the current observation
    pub pressure: Option<f64>,
    pub is_day: bool,
    pub conditions: Condition,
    /// Percent
    pub cloud_cover: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ForecastResult {
    pub current: Snapshot,
    /// Hours 1 through 5 after `current`
    pub forecast: Vec<Snapshot>,
}

/// Runs every target pipeline over a window and assembles the snapshots
#[derive(Debug, Clone)]
pub struct Forecaster {
    context: Arc<ModelContext>,
}

impl Forecaster {
    pub fn new(context: Arc<ModelContext>) -> Self {
        Self { context }
    }

    pub fn min_history(&self) -> usize {
        self.context.min_history()
    }

    pub fn forecast(&self, window: &ObservationWindow) -> Result<ForecastResult, ForecastError> {
        let required = self.min_history();
        let anchor = match window.current() {
            Some(anchor) if window.len() >= required => anchor,
            _ => {
                return Err(ForecastError::InsufficientHistory {
                    required,
                    actual: window.len(),
                })
            }
        };

        let mut horizons: [Horizon; Target::ALL.len()] = [[0.0; HORIZON]; Target::ALL.len()];
        for pipeline in self.context.pipelines() {
            let target = pipeline.target();
            horizons[target.index()] = pipeline.forecast(window)?.map(|v| target.finalize(v));
        }

        let current = current_snapshot(anchor)?;
        let forecast = (0..HORIZON)
            .map(|step| {
                let value = |target: Target| horizons[target.index()][step];
                let precipitation = value(Target::Precipitation);
                let snowfall = value(Target::Snowfall);
                let cloud_cover = value(Target::CloudCover);
                Ok(Snapshot {
                    temperature: value(Target::Temperature) as i64,
                    feels_like: None,
                    precipitation,
                    snowfall,
                    windspeed: value(Target::WindSpeed),
                    humidity: None,
                    pressure: None,
                    is_day: anchor.is_day,
                    conditions: categorize(precipitation, snowfall, cloud_cover)?,
                    cloud_cover: cloud_cover as i64,
                    valid_at: anchor.observed_at + Duration::hours(step as i64 + 1),
                })
            })
            .collect::<Result<Vec<_>, ForecastError>>()?;

        debug!(
            "forecast for {} from {} observations: current {}",
            window.location(),
            window.len(),
            current.conditions
        );
        Ok(ForecastResult { current, forecast })
    }
}

/// The anchor observation under the same clamping and rounding as predictions
fn current_snapshot(observation: &Observation) -> Result<Snapshot, ForecastError> {
    let precipitation = Target::Precipitation.finalize(observation.precipitation);
    let snowfall = Target::Snowfall.finalize(observation.snowfall);
    let cloud_cover = Target::CloudCover.finalize(observation.cloud_cover);
    Ok(Snapshot {
        temperature: Target::Temperature.finalize(observation.temperature_2m) as i64,
        feels_like: Some(round_to(observation.apparent_temperature, 0) as i64),
        precipitation,
        snowfall,
        windspeed: Target::WindSpeed.finalize(observation.wind_speed_10m),
        humidity: Some(round_to(observation.relative_humidity_2m, 0) as i64),
        pressure: Some(round_to(observation.surface_pressure, 1)),
        is_day: observation.is_day,
        conditions: categorize(precipitation, snowfall, cloud_cover)?,
        cloud_cover: cloud_cover as i64,
        valid_at: observation.observed_at,
    })
}
