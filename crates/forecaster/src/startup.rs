use crate::{
    download, files, get_locations, get_weather, routes, upload, FileAccess, FileData,
    Forecaster, ModelContext, ObservationAccess, ObservationData,
};
use anyhow::{anyhow, Context};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use log::info;
use std::sync::Arc;
use time::Duration;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

#[derive(Clone)]
pub struct AppState {
    pub file_access: Arc<dyn FileData>,
    pub observation_db: Arc<dyn ObservationData>,
    pub forecaster: Arc<Forecaster>,
    /// Lowercase identifiers that can be forecast
    pub locations: Vec<String>,
    /// Observations fetched per forecast
    pub window_size: usize,
    /// Oldest observation file considered
    pub lookback: Duration,
}

impl AppState {
    pub fn resolve_location(&self, requested: &str) -> Option<String> {
        let requested = requested.trim().to_lowercase();
        self.locations.iter().find(|l| **l == requested).cloned()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::weather::weather_routes::get_weather,
        routes::weather::weather_routes::get_locations,
        routes::files::download::download,
        routes::files::get_names::files,
        routes::files::upload::upload,
    ),
    components(
        schemas(
                routes::files::get_names::Files,
                routes::weather::weather_routes::ErrorResponse,
                routes::weather::weather_routes::Locations,
                crate::ForecastResult,
                crate::Snapshot,
                crate::Condition,
        )
    ),
    tags(
        (name = "skycast forecaster api", description = "a RESTful api serving short-horizon weather forecasts from stored observations")
    )
)]
struct ApiDoc;

/// Settings `build_app_state` needs from the CLI/config
#[derive(Debug, Clone)]
pub struct ForecasterSettings {
    pub data_dir: String,
    pub model_dir: String,
    pub locations: Vec<String>,
    pub window_size: usize,
    pub lookback_hours: i64,
}

pub fn build_app_state(settings: ForecasterSettings) -> Result<AppState, anyhow::Error> {
    let context = ModelContext::load(&settings.model_dir)
        .with_context(|| format!("error loading models from {}", settings.model_dir))?;
    let forecaster = Arc::new(Forecaster::new(Arc::new(context)));

    if settings.window_size < forecaster.min_history() {
        return Err(anyhow!(
            "window_size {} is smaller than the {} observations the models need",
            settings.window_size,
            forecaster.min_history()
        ));
    }

    let file_access = Arc::new(FileAccess::new(settings.data_dir));
    let observation_db = Arc::new(ObservationAccess::new(file_access.clone()));

    Ok(AppState {
        file_access,
        observation_db,
        forecaster,
        locations: settings
            .locations
            .iter()
            .map(|l| l.trim().to_lowercase())
            .collect(),
        window_size: settings.window_size,
        lookback: Duration::hours(settings.lookback_hours),
    })
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/weather/{location}", get(get_weather))
        .route("/locations", get(get_locations))
        .route("/files", get(files))
        .route("/file/{file_name}", get(download).post(upload))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .layer(DefaultBodyLimit::max(30 * 1024 * 1024))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default();
    info!(target: "http_request","new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
