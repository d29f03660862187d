use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::ForecastError;

/// One hourly reading for a location, as written by the ingestion daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub observed_at: OffsetDateTime,
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

/// Named observation fields a model can consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Temperature,
    RelativeHumidity,
    ApparentTemperature,
    Precipitation,
    Rain,
    Showers,
    Snowfall,
    PressureMsl,
    SurfacePressure,
    CloudCover,
    WindSpeed,
    WindDirection,
    WindGusts,
    IsDay,
    Year,
    Month,
    Day,
    Hour,
    Cluster,
}

impl Column {
    /// Measured quantities, i.e. the fields that must be finite
    pub const MEASURES: [Column; 13] = [
        Column::Temperature,
        Column::RelativeHumidity,
        Column::ApparentTemperature,
        Column::Precipitation,
        Column::Rain,
        Column::Showers,
        Column::Snowfall,
        Column::PressureMsl,
        Column::SurfacePressure,
        Column::CloudCover,
        Column::WindSpeed,
        Column::WindDirection,
        Column::WindGusts,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Column::Temperature => "temperature_2m",
            Column::RelativeHumidity => "relative_humidity_2m",
            Column::ApparentTemperature => "apparent_temperature",
            Column::Precipitation => "precipitation",
            Column::Rain => "rain",
            Column::Showers => "showers",
            Column::Snowfall => "snowfall",
            Column::PressureMsl => "pressure_msl",
            Column::SurfacePressure => "surface_pressure",
            Column::CloudCover => "cloud_cover",
            Column::WindSpeed => "wind_speed_10m",
            Column::WindDirection => "wind_direction_10m",
            Column::WindGusts => "wind_gusts_10m",
            Column::IsDay => "is_day",
            Column::Year => "year",
            Column::Month => "month",
            Column::Day => "day",
            Column::Hour => "hour",
            Column::Cluster => "cluster",
        }
    }

    /// Value of this column as a model input
    pub fn value(self, observation: &Observation) -> f64 {
        match self {
            Column::Temperature => observation.temperature_2m,
            Column::RelativeHumidity => observation.relative_humidity_2m,
            Column::ApparentTemperature => observation.apparent_temperature,
            Column::Precipitation => observation.precipitation,
            Column::Rain => observation.rain,
            Column::Showers => observation.showers,
            Column::Snowfall => observation.snowfall,
            Column::PressureMsl => observation.pressure_msl,
            Column::SurfacePressure => observation.surface_pressure,
            Column::CloudCover => observation.cloud_cover,
            Column::WindSpeed => observation.wind_speed_10m,
            Column::WindDirection => observation.wind_direction_10m,
            Column::WindGusts => observation.wind_gusts_10m,
            Column::IsDay => {
                if observation.is_day {
                    1.0
                } else {
                    0.0
                }
            }
            Column::Year => observation.year as f64,
            Column::Month => observation.month as f64,
            Column::Day => observation.day as f64,
            Column::Hour => observation.hour as f64,
            Column::Cluster => observation.cluster as f64,
        }
    }
}

impl Observation {
    /// Measures must be finite, the calendar fields must name a real UTC
    /// hour and the cluster label must be non-negative.
    fn check(&self) -> Result<(), ForecastError> {
        let non_finite = Column::MEASURES
            .iter()
            .find(|column| !column.value(self).is_finite())
            .map(|column| column.name());
        let invalid = non_finite.or_else(|| {
            [
                (Column::Month, (1..=12).contains(&self.month)),
                (Column::Day, (1..=31).contains(&self.day)),
                (Column::Hour, (0..=23).contains(&self.hour)),
                (Column::Cluster, self.cluster >= 0),
            ]
            .into_iter()
            .find(|(_, ok)| !ok)
            .map(|(column, _)| column.name())
        });

        match invalid {
            Some(field) => Err(ForecastError::InvalidObservation {
                observed_at: self
                    .observed_at
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| self.observed_at.to_string()),
                field,
            }),
            None => Ok(()),
        }
    }
}

/// The most recent observations for one location, oldest first.
///
/// Construction checks that timestamps strictly increase and that every
/// row is in range, so downstream stages can index freely.
#[derive(Debug, Clone)]
pub struct ObservationWindow {
    location: String,
    observations: Vec<Observation>,
}

impl ObservationWindow {
    pub fn new(
        location: impl Into<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, ForecastError> {
        for (index, pair) in observations.windows(2).enumerate() {
            if pair[1].observed_at <= pair[0].observed_at {
                return Err(ForecastError::UnorderedWindow { index: index + 1 });
            }
        }
        for observation in &observations {
            observation.check()?;
        }
        Ok(Self {
            location: location.into(),
            observations,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// The anchor every forecast is made from
    pub fn current(&self) -> Option<&Observation> {
        self.observations.last()
    }
}
