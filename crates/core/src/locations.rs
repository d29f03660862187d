use serde::{Deserialize, Serialize};

/// A fixed location the daemon observes and the forecaster serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Lowercase identifier used in file rows and request paths
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_lowercase(),
            latitude,
            longitude,
        }
    }
}

pub fn default_locations() -> Vec<Location> {
    vec![
        Location::new("colchester", 51.8959, 0.8919),
        Location::new("london", 51.5072, 0.1276),
        Location::new("bristol", 51.4545, 2.5879),
    ]
}

pub fn default_location_names() -> Vec<String> {
    default_locations().into_iter().map(|l| l.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercased() {
        assert_eq!(Location::new("London", 0.0, 0.0).name, "london");
        assert_eq!(
            default_location_names(),
            vec!["colchester", "london", "bristol"]
        );
    }
}
