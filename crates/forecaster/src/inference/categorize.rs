use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ForecastError;

/// Cloud cover percentage at or above which the sky counts as cloudy
pub const CLOUD_COVER_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Clear,
    Cloudy,
    RainAndClear,
    RainAndCloudy,
    SnowAndClear,
    SnowAndCloudy,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Clear => "clear",
            Condition::Cloudy => "cloudy",
            Condition::RainAndClear => "rain-and-clear",
            Condition::RainAndCloudy => "rain-and-cloudy",
            Condition::SnowAndClear => "snow-and-clear",
            Condition::SnowAndCloudy => "snow-and-cloudy",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sky condition for one snapshot. Precipitation is checked before snowfall,
/// so a row with both resolves to rain. Inputs outside the physical domain
/// (negative or NaN) match no branch and are reported, never defaulted.
pub fn categorize(
    precipitation: f64,
    snowfall: f64,
    cloud_cover: f64,
) -> Result<Condition, ForecastError> {
    let clear = (0.0..CLOUD_COVER_THRESHOLD).contains(&cloud_cover);
    let cloudy = cloud_cover >= CLOUD_COVER_THRESHOLD;

    let condition = if precipitation == 0.0 && snowfall == 0.0 && clear {
        Some(Condition::Clear)
    } else if precipitation == 0.0 && snowfall == 0.0 && cloudy {
        Some(Condition::Cloudy)
    } else if precipitation > 0.0 && snowfall >= 0.0 && clear {
        Some(Condition::RainAndClear)
    } else if precipitation > 0.0 && snowfall >= 0.0 && cloudy {
        Some(Condition::RainAndCloudy)
    } else if precipitation == 0.0 && snowfall > 0.0 && clear {
        Some(Condition::SnowAndClear)
    } else if precipitation == 0.0 && snowfall > 0.0 && cloudy {
        Some(Condition::SnowAndCloudy)
    } else {
        None
    };

    condition.ok_or(ForecastError::UndefinedCondition {
        precipitation,
        snowfall,
        cloud_cover,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dry_rows_split_on_cloud_cover() {
        assert_eq!(categorize(0.0, 0.0, 25.0).unwrap(), Condition::Clear);
        assert_eq!(categorize(0.0, 0.0, 65.0).unwrap(), Condition::Cloudy);
    }

    #[test]
    fn threshold_is_cloudy() {
        assert_eq!(categorize(0.0, 0.0, 40.0).unwrap(), Condition::Cloudy);
        assert_eq!(categorize(0.0, 0.0, 39.9).unwrap(), Condition::Clear);
    }

    #[test]
    fn rain_wins_over_snow() {
        assert_eq!(categorize(5.0, 3.0, 10.0).unwrap(), Condition::RainAndClear);
        assert_eq!(categorize(5.0, 3.0, 90.0).unwrap(), Condition::RainAndCloudy);
    }

    #[test]
    fn snow_without_rain() {
        assert_eq!(categorize(0.0, 2.0, 65.0).unwrap(), Condition::SnowAndCloudy);
        assert_eq!(categorize(0.0, 2.0, 5.0).unwrap(), Condition::SnowAndClear);
    }

    /// Amounts in mm or cm, with exact zeros drawn often enough to hit the dry rows
    fn amount() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.0), 0.0f64..200.0]
    }

    proptest! {
        #[test]
        fn total_over_the_clamped_domain(
            precipitation in amount(),
            snowfall in amount(),
            cloud_cover in 0.0f64..=100.0
        ) {
            prop_assert!(categorize(precipitation, snowfall, cloud_cover).is_ok());
        }

        #[test]
        fn cloudy_labels_follow_the_threshold(
            precipitation in amount(),
            snowfall in amount(),
            cloud_cover in 0.0f64..=100.0
        ) {
            let condition = categorize(precipitation, snowfall, cloud_cover).unwrap();
            let cloudy = matches!(
                condition,
                Condition::Cloudy | Condition::RainAndCloudy | Condition::SnowAndCloudy
            );
            prop_assert_eq!(cloudy, cloud_cover >= CLOUD_COVER_THRESHOLD);
        }
    }

    #[test]
    fn out_of_domain_inputs_are_undefined() {
        for (p, s, c) in [
            (0.0, 0.0, -1.0),
            (-0.5, 0.0, 50.0),
            (0.0, -2.0, 10.0),
            (f64::NAN, 0.0, 10.0),
        ] {
            assert!(matches!(
                categorize(p, s, c),
                Err(ForecastError::UndefinedCondition { .. })
            ));
        }
    }

    #[test]
    fn labels_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Condition::SnowAndCloudy).unwrap(),
            "\"snow-and-cloudy\""
        );
        assert_eq!(Condition::RainAndClear.to_string(), "rain-and-clear");
    }
}
