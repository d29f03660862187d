use std::fmt;

use super::{Column, LagFeatureBuilder};

/// Variables with their own forecast model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    Temperature,
    Precipitation,
    Snowfall,
    CloudCover,
    WindSpeed,
}

const TEMPERATURE_COLUMNS: [Column; 8] = [
    Column::Temperature,
    Column::ApparentTemperature,
    Column::Showers,
    Column::CloudCover,
    Column::WindSpeed,
    Column::Month,
    Column::Day,
    Column::Cluster,
];

const PRECIPITATION_COLUMNS: [Column; 11] = [
    Column::Precipitation,
    Column::ApparentTemperature,
    Column::Showers,
    Column::PressureMsl,
    Column::CloudCover,
    Column::WindDirection,
    Column::WindGusts,
    Column::IsDay,
    Column::Month,
    Column::Day,
    Column::Cluster,
];

const SNOWFALL_COLUMNS: [Column; 2] = [Column::Snowfall, Column::Precipitation];

const CLOUD_COVER_COLUMNS: [Column; 17] = [
    Column::CloudCover,
    Column::Temperature,
    Column::RelativeHumidity,
    Column::ApparentTemperature,
    Column::Precipitation,
    Column::Rain,
    Column::Showers,
    Column::Snowfall,
    Column::PressureMsl,
    Column::WindSpeed,
    Column::WindDirection,
    Column::WindGusts,
    Column::IsDay,
    Column::Month,
    Column::Day,
    Column::Hour,
    Column::Cluster,
];

const WIND_SPEED_COLUMNS: [Column; 17] = [
    Column::WindSpeed,
    Column::Temperature,
    Column::ApparentTemperature,
    Column::Precipitation,
    Column::Rain,
    Column::Showers,
    Column::Snowfall,
    Column::PressureMsl,
    Column::SurfacePressure,
    Column::CloudCover,
    Column::WindDirection,
    Column::WindGusts,
    Column::IsDay,
    Column::Month,
    Column::Day,
    Column::Hour,
    Column::Cluster,
];

impl Target {
    pub const ALL: [Target; 5] = [
        Target::Temperature,
        Target::Precipitation,
        Target::Snowfall,
        Target::CloudCover,
        Target::WindSpeed,
    ];

    /// Position in [`Target::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Target::Temperature => 0,
            Target::Precipitation => 1,
            Target::Snowfall => 2,
            Target::CloudCover => 3,
            Target::WindSpeed => 4,
        }
    }

    /// File name stem shared by the model and scaler artifacts
    pub const fn artifact_stem(self) -> &'static str {
        match self {
            Target::Temperature => "temperature",
            Target::Precipitation => "rain",
            Target::Snowfall => "snow",
            Target::CloudCover => "cloud",
            Target::WindSpeed => "wind",
        }
    }

    pub fn feature_builder(self) -> LagFeatureBuilder {
        match self {
            Target::Temperature => LagFeatureBuilder::new(&TEMPERATURE_COLUMNS, 1),
            Target::Precipitation => LagFeatureBuilder::new(&PRECIPITATION_COLUMNS, 2),
            Target::Snowfall => LagFeatureBuilder::new(&SNOWFALL_COLUMNS, 1),
            Target::CloudCover => LagFeatureBuilder::new(&CLOUD_COVER_COLUMNS, 1),
            Target::WindSpeed => LagFeatureBuilder::new(&WIND_SPEED_COLUMNS, 1),
        }
    }

    /// Negative amounts are not physical; temperature can go below zero
    pub const fn floored_at_zero(self) -> bool {
        !matches!(self, Target::Temperature)
    }

    pub const fn decimals(self) -> u32 {
        match self {
            Target::Temperature | Target::CloudCover => 0,
            Target::Precipitation | Target::Snowfall | Target::WindSpeed => 1,
        }
    }

    /// Clamp, then round, a physical value for reporting
    pub fn finalize(self, value: f64) -> f64 {
        let value = if self.floored_at_zero() {
            value.max(0.0)
        } else {
            value
        };
        round_to(value, self.decimals())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Target::Temperature => "temperature",
            Target::Precipitation => "precipitation",
            Target::Snowfall => "snowfall",
            Target::CloudCover => "cloud cover",
            Target::WindSpeed => "wind speed",
        };
        f.write_str(name)
    }
}

/// Round half to even at `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round_ties_even() / factor;
    // normalizes -0.0 after flooring tiny negatives
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
