use crate::helpers::{observations, spawn_app, MockObservationAccess};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use forecaster::{Condition, Error, ErrorResponse, ForecastResult, Locations};
use hyper::Method;
use serde_json::from_slice;
use std::sync::Arc;
use time::{macros::datetime, Duration};
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn error_body(response: axum::response::Response) -> ErrorResponse {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    from_slice(&body).unwrap()
}

#[tokio::test]
async fn forecasts_configured_location() {
    let mut observation_db = MockObservationAccess::new();
    observation_db
        .expect_latest_observations()
        .withf(|req| req.location == "london" && req.limit == 5 && req.start.is_some())
        .times(1)
        .returning(|_| Ok(observations(5)));
    let test_app = spawn_app(Arc::new(observation_db)).await;

    let response = test_app
        .app
        .oneshot(get("/weather/London"))
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let result: ForecastResult = from_slice(&body).unwrap();

    let current = &result.current;
    assert_eq!(current.valid_at, datetime!(2024-11-02 04:00 UTC));
    assert_eq!(current.temperature, 12);
    assert_eq!(current.feels_like, Some(8));
    assert_eq!(current.humidity, Some(82));
    assert_eq!(current.pressure, Some(1015.9));
    assert_eq!(current.windspeed, 14.8);
    assert_eq!(current.conditions, Condition::Cloudy);

    assert_eq!(result.forecast.len(), 5);
    let temperatures: Vec<i64> = result.forecast.iter().map(|s| s.temperature).collect();
    assert_eq!(temperatures, vec![11, 12, 12, 13, 13]);
    let precipitation: Vec<f64> = result.forecast.iter().map(|s| s.precipitation).collect();
    assert_eq!(precipitation, vec![0.0, 0.4, 1.3, 0.0, 0.0]);
    let windspeed: Vec<f64> = result.forecast.iter().map(|s| s.windspeed).collect();
    assert_eq!(windspeed, vec![14.0, 15.5, 16.0, 0.0, 12.3]);
    let conditions: Vec<Condition> = result.forecast.iter().map(|s| s.conditions).collect();
    assert_eq!(
        conditions,
        vec![
            Condition::Clear,
            Condition::RainAndCloudy,
            Condition::RainAndClear,
            Condition::Clear,
            Condition::SnowAndCloudy,
        ]
    );
    for (step, snapshot) in result.forecast.iter().enumerate() {
        assert_eq!(
            snapshot.valid_at,
            current.valid_at + Duration::hours(step as i64 + 1)
        );
        assert!(snapshot.is_day);
        assert!(snapshot.humidity.is_none());
        assert!(snapshot.pressure.is_none());
    }
}

#[tokio::test]
async fn unknown_location_is_not_found_without_fetching() {
    let mut observation_db = MockObservationAccess::new();
    observation_db.expect_latest_observations().times(0);
    let test_app = spawn_app(Arc::new(observation_db)).await;

    let response = test_app.app.oneshot(get("/weather/atlantis")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = error_body(response).await;
    assert_eq!(body.error, "unknown_location");
    assert!(body.message.contains("atlantis"));
}

#[tokio::test]
async fn short_history_is_unprocessable() {
    let mut observation_db = MockObservationAccess::new();
    observation_db
        .expect_latest_observations()
        .times(1)
        .returning(|_| Ok(observations(2)));
    let test_app = spawn_app(Arc::new(observation_db)).await;

    let response = test_app.app.oneshot(get("/weather/bristol")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_body(response).await.error, "insufficient_history");
}

#[tokio::test]
async fn no_stored_data_is_unprocessable() {
    let mut observation_db = MockObservationAccess::new();
    observation_db
        .expect_latest_observations()
        .times(1)
        .returning(|_| Ok(vec![]));
    let test_app = spawn_app(Arc::new(observation_db)).await;

    let response = test_app.app.oneshot(get("/weather/colchester")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn observation_source_failure_is_unavailable() {
    let mut observation_db = MockObservationAccess::new();
    observation_db
        .expect_latest_observations()
        .times(1)
        .returning(|_| Err(Error::ColumnType("observed_at")));
    let test_app = spawn_app(Arc::new(observation_db)).await;

    let response = test_app.app.oneshot(get("/weather/london")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_body(response).await.error, "upstream_fetch_failure");
}

#[tokio::test]
async fn unordered_observations_are_a_server_error() {
    let mut observation_db = MockObservationAccess::new();
    observation_db.expect_latest_observations().returning(|_| {
        let mut rows = observations(4);
        rows.swap(1, 2);
        Ok(rows)
    });
    let test_app = spawn_app(Arc::new(observation_db)).await;

    let response = test_app.app.oneshot(get("/weather/london")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_body(response).await.error, "unordered_window");
}

#[tokio::test]
async fn lists_configured_locations() {
    let test_app = spawn_app(Arc::new(MockObservationAccess::new())).await;

    let response = test_app.app.oneshot(get("/locations")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let locations: Locations = from_slice(&body).unwrap();
    assert_eq!(locations.locations, vec!["colchester", "london", "bristol"]);
}
