use crate::helpers::{observations, spawn_app_with_files, write_observation_file};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use forecaster::{
    FileAccess, ForecastResult, ObservationAccess, ObservationData, ObservationRequest,
};
use serde_json::from_slice;
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, macros::datetime, Duration, OffsetDateTime};
use tower::ServiceExt;

fn file_name(generated_at: OffsetDateTime) -> String {
    format!("observations_{}.parquet", generated_at.format(&Rfc3339).unwrap())
}

fn access(data_dir: &std::path::Path) -> ObservationAccess {
    ObservationAccess::new(Arc::new(FileAccess::new(
        data_dir.to_string_lossy().to_string(),
    )))
}

#[tokio::test]
async fn returns_newest_rows_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    let rows = observations(6);
    for (i, row) in rows.iter().enumerate() {
        let generated_at = datetime!(2024-11-02 00:05 UTC) + Duration::hours(i as i64);
        write_observation_file(
            dir.path(),
            &file_name(generated_at),
            &[("london", row), ("bristol", row)],
        );
    }

    let found = access(dir.path())
        .latest_observations(&ObservationRequest {
            location: "london".to_string(),
            limit: 4,
            start: None,
        })
        .await
        .unwrap();

    assert_eq!(found.len(), 4);
    assert_eq!(found, rows[2..].to_vec());
}

#[tokio::test]
async fn ignores_other_locations_and_old_files() {
    let dir = tempfile::tempdir().unwrap();
    let rows = observations(3);
    write_observation_file(
        dir.path(),
        "observations_2024-11-01T23:00:00Z.parquet",
        &[("london", &rows[0])],
    );
    write_observation_file(
        dir.path(),
        "observations_2024-11-02T02:00:00Z.parquet",
        &[("london", &rows[1]), ("colchester", &rows[2])],
    );

    let access = access(dir.path());
    let found = access
        .latest_observations(&ObservationRequest {
            location: "london".to_string(),
            limit: 5,
            start: Some(datetime!(2024-11-02 00:00 UTC)),
        })
        .await
        .unwrap();
    assert_eq!(found, vec![rows[1].clone()]);

    let none = access
        .latest_observations(&ObservationRequest {
            location: "atlantis".to_string(),
            limit: 5,
            start: None,
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn repeated_readings_are_collapsed() {
    let dir = tempfile::tempdir().unwrap();
    let rows = observations(2);
    write_observation_file(
        dir.path(),
        "observations_2024-11-02T01:00:00Z.parquet",
        &[("london", &rows[0]), ("london", &rows[1])],
    );
    write_observation_file(
        dir.path(),
        "observations_2024-11-02T01:30:00Z.parquet",
        &[("london", &rows[1])],
    );

    let found = access(dir.path())
        .latest_observations(&ObservationRequest {
            location: "london".to_string(),
            limit: 3,
            start: None,
        })
        .await
        .unwrap();
    assert_eq!(found, rows);
}

#[tokio::test]
async fn empty_store_returns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let found = access(dir.path())
        .latest_observations(&ObservationRequest {
            location: "london".to_string(),
            limit: 5,
            start: None,
        })
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn forecasts_from_stored_parquet_files() {
    let test_app = spawn_app_with_files().await;
    let now = OffsetDateTime::now_utc();
    for (i, row) in observations(5).iter().enumerate() {
        let generated_at = now - Duration::hours(5 - i as i64);
        write_observation_file(
            test_app.data_dir.path(),
            &file_name(generated_at),
            &[("london", row)],
        );
    }

    let request = Request::builder()
        .uri("/weather/london")
        .body(Body::empty())
        .unwrap();
    let response = test_app.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let result: ForecastResult = from_slice(&body).unwrap();
    assert_eq!(result.forecast.len(), 5);
    assert_eq!(result.current.valid_at, datetime!(2024-11-02 04:00 UTC));
}
