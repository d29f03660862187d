use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{AppState, ForecastError, ForecastResult, ObservationRequest, ObservationWindow};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable code, e.g. `unknown_location`
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Locations {
    pub locations: Vec<String>,
}

impl ForecastError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForecastError::UnknownLocation(_) => StatusCode::NOT_FOUND,
            ForecastError::InsufficientHistory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ForecastError::UpstreamFetchFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            ForecastError::SchemaMismatch(_)
            | ForecastError::UndefinedCondition { .. }
            | ForecastError::InvalidObservation { .. }
            | ForecastError::UnorderedWindow { .. }
            | ForecastError::InvalidPrediction(_)
            | ForecastError::Artifact(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("forecast failed: {}", self);
        } else {
            warn!("forecast rejected: {}", self);
        }
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[utoipa::path(
    get,
    path = "weather/{location}",
    params(
        ("location" = String, Path, description = "Configured location identifier, case-insensitive"),
    ),
    responses(
        (status = OK, description = "Current conditions and the next five hourly forecasts", body = ForecastResult),
        (status = NOT_FOUND, description = "Location is not configured", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Not enough stored observations to forecast", body = ErrorResponse),
        (status = SERVICE_UNAVAILABLE, description = "Observations could not be read", body = ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Model, artifact or data fault", body = ErrorResponse)
    ))]
pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
) -> Result<Json<ForecastResult>, ForecastError> {
    let location = state
        .resolve_location(&location)
        .ok_or(ForecastError::UnknownLocation(location))?;

    let req = ObservationRequest {
        location: location.clone(),
        limit: state.window_size,
        start: Some(OffsetDateTime::now_utc() - state.lookback),
    };
    let observations = state
        .observation_db
        .latest_observations(&req)
        .await
        .map_err(|e| ForecastError::UpstreamFetchFailure(e.to_string()))?;

    let window = ObservationWindow::new(location, observations)?;
    let result = state.forecaster.forecast(&window)?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "locations",
    responses(
        (status = OK, description = "Locations that can be forecast", body = Locations)
    ))]
pub async fn get_locations(State(state): State<Arc<AppState>>) -> Json<Locations> {
    Json(Locations {
        locations: state.locations.clone(),
    })
}
