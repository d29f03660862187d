use anyhow::{anyhow, Error};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::record::RecordWriter;
use parquet_derive::ParquetRecordWriter;
use serde::Deserialize;
use skycast_core::Location;
use slog::{error, info, Logger};
use std::fs::File;
use std::sync::Arc;
use time::{macros::format_description, OffsetDateTime};

use crate::{ClusterModel, JsonFetcher};

/// Variables requested from the `current=` block, in request order
pub const CURRENT_VARIABLES: [&str; 15] = [
    "temperature_2m",
    "relative_humidity_2m",
    "apparent_temperature",
    "is_day",
    "precipitation",
    "rain",
    "showers",
    "snowfall",
    "weather_code",
    "cloud_cover",
    "pressure_msl",
    "surface_pressure",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
];

#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub current: CurrentConditions,
}

/// `current` block of an Open-Meteo forecast response requested with `timeformat=unixtime`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentConditions {
    pub time: i64,
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub apparent_temperature: f64,
    pub is_day: u8,
    pub precipitation: f64,
    pub rain: f64,
    pub showers: f64,
    pub snowfall: f64,
    pub weather_code: Option<i64>,
    pub cloud_cover: f64,
    pub pressure_msl: f64,
    pub surface_pressure: f64,
    pub wind_speed_10m: f64,
    pub wind_direction_10m: f64,
    pub wind_gusts_10m: f64,
}

impl CurrentConditions {
    pub fn cluster_features(&self) -> [f64; 4] {
        [
            self.temperature_2m,
            self.precipitation,
            self.rain,
            self.showers,
        ]
    }
}

/// One row of an observations parquet file
#[derive(Debug, Clone, PartialEq, ParquetRecordWriter)]
pub struct ObservationRecord {
    pub location: String,
    pub observed_at: String,
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub apparent_temperature: f64,
    pub precipitation: f64,
    pub rain: f64,
    pub showers: f64,
    pub snowfall: f64,
    pub pressure_msl: f64,
    pub surface_pressure: f64,
    pub cloud_cover: f64,
    pub wind_speed_10m: f64,
    pub wind_direction_10m: f64,
    pub wind_gusts_10m: f64,
    pub is_day: bool,
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    pub cluster: i64,
}

impl ObservationRecord {
    pub fn from_current(
        location: &str,
        current: &CurrentConditions,
        cluster: i64,
    ) -> Result<Self, Error> {
        let observed = OffsetDateTime::from_unix_timestamp(current.time)
            .map_err(|e| anyhow!("invalid observation time {}: {}", current.time, e))?;
        let observed_at = observed
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
            ))
            .map_err(|e| anyhow!("error formatting observed_at time: {}", e))?;

        let record = ObservationRecord {
            location: location.to_lowercase(),
            observed_at,
            temperature_2m: current.temperature_2m,
            relative_humidity_2m: current.relative_humidity_2m,
            apparent_temperature: current.apparent_temperature,
            precipitation: current.precipitation,
            rain: current.rain,
            showers: current.showers,
            snowfall: current.snowfall,
            pressure_msl: current.pressure_msl,
            surface_pressure: current.surface_pressure,
            cloud_cover: current.cloud_cover,
            wind_speed_10m: current.wind_speed_10m,
            wind_direction_10m: current.wind_direction_10m,
            wind_gusts_10m: current.wind_gusts_10m,
            is_day: current.is_day != 0,
            year: i64::from(observed.year()),
            month: i64::from(u8::from(observed.month())),
            day: i64::from(observed.day()),
            hour: i64::from(observed.hour()),
            cluster,
        };
        if !record.is_finite() {
            return Err(anyhow!(
                "non-finite value in observation for {}",
                record.location
            ));
        }
        Ok(record)
    }

    fn is_finite(&self) -> bool {
        [
            self.temperature_2m,
            self.relative_humidity_2m,
            self.apparent_temperature,
            self.precipitation,
            self.rain,
            self.showers,
            self.snowfall,
            self.pressure_msl,
            self.surface_pressure,
            self.cloud_cover,
            self.wind_speed_10m,
            self.wind_direction_10m,
            self.wind_gusts_10m,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

pub struct ObservationService {
    pub logger: Logger,
    pub fetcher: Arc<JsonFetcher>,
    pub api_url: String,
    pub cluster_model: Arc<ClusterModel>,
}

impl ObservationService {
    pub fn new(
        logger: Logger,
        fetcher: Arc<JsonFetcher>,
        api_url: String,
        cluster_model: Arc<ClusterModel>,
    ) -> Self {
        ObservationService {
            logger,
            fetcher,
            api_url,
            cluster_model,
        }
    }

    pub fn build_url(&self, location: &Location) -> String {
        format!(
            "{}?latitude={}&longitude={}&current={}&timeformat=unixtime&timezone=GMT",
            self.api_url,
            location.latitude,
            location.longitude,
            CURRENT_VARIABLES.join(",")
        )
    }

    pub async fn fetch_observation(&self, location: &Location) -> Result<ObservationRecord, Error> {
        let url = self.build_url(location);
        let response: CurrentResponse = self.fetcher.fetch_json(&url).await?;
        let cluster = self
            .cluster_model
            .assign(&response.current.cluster_features())?;
        ObservationRecord::from_current(&location.name, &response.current, cluster)
    }

    /// Fetches every location; a location that fails is logged and left out of the run.
    pub async fn get_observations(&self, locations: &[Location]) -> Vec<ObservationRecord> {
        let mut observations = Vec::with_capacity(locations.len());
        for location in locations {
            match self.fetch_observation(location).await {
                Ok(record) => {
                    info!(
                        self.logger,
                        "fetched {} at {} (cluster {})",
                        record.location,
                        record.observed_at,
                        record.cluster
                    );
                    observations.push(record)
                }
                Err(e) => error!(
                    self.logger,
                    "error fetching {} weather data: {}", location.name, e
                ),
            }
        }
        observations
    }
}

/// Writes all rows of one run into a single row group and returns the file path
pub fn save_observations(
    logger: &Logger,
    observations: &[ObservationRecord],
    subfolder: &str,
    file_name: &str,
) -> Result<String, Error> {
    let output_path = format!("{}/{}.parquet", subfolder, file_name);
    let schema = observations
        .schema()
        .map_err(|e| anyhow!("failed to build observation schema: {}", e))?;

    let file =
        File::create(&output_path).map_err(|e| anyhow!("failed to create parquet file: {}", e))?;
    let props = WriterProperties::builder().build();
    let mut writer = SerializedFileWriter::new(file, schema, Arc::new(props))
        .map_err(|e| anyhow!("failed to create parquet writer: {}", e))?;

    info!(
        logger,
        "writing {} observations to {}",
        observations.len(),
        output_path
    );
    let mut row_group = writer
        .next_row_group()
        .map_err(|e| anyhow!("failed to create row group: {}", e))?;
    observations
        .write_to_row_group(&mut row_group)
        .map_err(|e| anyhow!("failed to write observations: {}", e))?;
    row_group
        .close()
        .map_err(|e| anyhow!("failed to close row group: {}", e))?;
    writer
        .close()
        .map_err(|e| anyhow!("failed to close parquet writer: {}", e))?;

    Ok(output_path)
}
