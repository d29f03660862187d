use skycast_core::Scaler;

use super::{FeatureRow, ForecastError, Horizon, HORIZON};

/// Input and output scalers fit alongside one target's model
#[derive(Debug, Clone)]
pub struct ScalerPair {
    input: Scaler,
    output: Scaler,
}

impl ScalerPair {
    pub fn new(input: Scaler, output: Scaler) -> Result<Self, ForecastError> {
        input.validate()?;
        output.validate()?;
        if output.width() != HORIZON {
            return Err(ForecastError::SchemaMismatch(format!(
                "output scaler covers {} steps, expected {}",
                output.width(),
                HORIZON
            )));
        }
        Ok(Self { input, output })
    }

    pub fn input(&self) -> &Scaler {
        &self.input
    }

    pub fn output(&self) -> &Scaler {
        &self.output
    }

    /// Normalize a feature row; names and order must equal the fitted schema
    pub fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>, ForecastError> {
        Ok(self.input.transform_named(&row.names, &row.values)?)
    }

    /// Map a normalized horizon back to physical units
    pub fn inverse_transform(&self, horizon: &Horizon) -> Result<Horizon, ForecastError> {
        let physical = self.output.inverse_transform(horizon)?;
        physical.try_into().map_err(|values: Vec<f64>| {
            ForecastError::SchemaMismatch(format!(
                "output scaler returned {} steps, expected {}",
                values.len(),
                HORIZON
            ))
        })
    }
}
