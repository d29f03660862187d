//! Ingestion against a mock Open-Meteo and a mock forecaster upload endpoint

use daemon::{
    send_parquet_file, save_observations, ClusterModel, JsonFetcher, ObservationService,
    RateLimiter, CLUSTER_FEATURES,
};
use skycast_core::{Location, Scaler};
use slog::{o, Discard, Logger};
use std::sync::Arc;
use tokio::sync::Mutex;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn logger() -> Logger {
    Logger::root(Discard, o!())
}

fn cluster_model() -> Arc<ClusterModel> {
    let scaler = Scaler::standard(
        &CLUSTER_FEATURES,
        vec![0.0, 0.0, 0.0, 0.0],
        vec![1.0, 1.0, 1.0, 1.0],
    )
    .unwrap();
    Arc::new(
        ClusterModel::new(
            scaler,
            vec![vec![0.0, 0.0, 0.0, 0.0], vec![12.0, 0.0, 0.0, 0.0]],
        )
        .unwrap(),
    )
}

fn current_body(temperature: f64) -> serde_json::Value {
    serde_json::json!({
        "latitude": 51.5,
        "longitude": 0.12,
        "current": {
            "time": 1730545200,
            "interval": 900,
            "temperature_2m": temperature,
            "relative_humidity_2m": 83,
            "apparent_temperature": 9.8,
            "is_day": 0,
            "precipitation": 0.0,
            "rain": 0.0,
            "showers": 0.0,
            "snowfall": 0.0,
            "weather_code": 3,
            "cloud_cover": 64,
            "pressure_msl": 1018.3,
            "surface_pressure": 1015.9,
            "wind_speed_10m": 14.8,
            "wind_direction_10m": 236,
            "wind_gusts_10m": 31.3
        }
    })
}

fn service(server: &MockServer) -> ObservationService {
    let limiter = Arc::new(Mutex::new(RateLimiter::new(10, 10.0)));
    let fetcher =
        Arc::new(JsonFetcher::new(logger(), String::from("skycast-test"), limiter).unwrap());
    ObservationService::new(
        logger(),
        fetcher,
        format!("{}/v1/forecast", server.uri()),
        cluster_model(),
    )
}

#[tokio::test]
async fn fetches_current_conditions_and_assigns_cluster() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "51.5072"))
        .and(query_param("timeformat", "unixtime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(11.4)))
        .expect(1)
        .mount(&server)
        .await;

    let record = service(&server)
        .fetch_observation(&Location::new("London", 51.5072, 0.1276))
        .await
        .unwrap();

    assert_eq!(record.location, "london");
    assert_eq!(record.observed_at, "2024-11-02T11:00:00Z");
    assert_eq!(record.cluster, 1);
    assert!(!record.is_day);
    assert_eq!(record.cloud_cover, 64.0);
}

#[tokio::test]
async fn failing_location_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("latitude", "51.8959"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(1.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("latitude", "51.4545"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let observations = service(&server)
        .get_observations(&[
            Location::new("colchester", 51.8959, 0.8919),
            Location::new("bristol", 51.4545, 2.5879),
        ])
        .await;

    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].location, "colchester");
    assert_eq!(observations[0].cluster, 0);
}

#[tokio::test]
async fn uploads_parquet_to_forecaster() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(11.4)))
        .mount(&api)
        .await;
    let forecaster = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/file/observations_2024-11-02T11:00:00Z.parquet"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&forecaster)
        .await;

    let observations = service(&api)
        .get_observations(&[Location::new("london", 51.5072, 0.1276)])
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = save_observations(
        &logger(),
        &observations,
        dir.path().to_str().unwrap(),
        "observations_2024-11-02T11:00:00Z",
    )
    .unwrap();

    send_parquet_file(&forecaster.uri(), &logger(), &file)
        .await
        .unwrap();
}
