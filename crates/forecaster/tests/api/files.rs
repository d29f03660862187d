use crate::helpers::{spawn_app, MockObservationAccess};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use forecaster::Files;
use hyper::{header, Method};
use serde_json::from_slice;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "skycast-test-boundary";
const FILE_NAME: &str = "observations_2024-11-02T11:00:00Z.parquet";

fn upload_request(file_name: &str, contents: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/parquet\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(format!("/file/{file_name}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn uploaded_file_can_be_listed_and_downloaded() {
    let test_app = spawn_app(Arc::new(MockObservationAccess::new())).await;
    let contents = b"PAR1 not really parquet PAR1";

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request(FILE_NAME, contents))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(test_app
        .data_dir
        .path()
        .join("2024-11-02")
        .join(FILE_NAME)
        .exists());

    let request = Request::builder()
        .uri("/files")
        .body(Body::empty())
        .unwrap();
    let response = test_app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let files: Files = from_slice(&body).unwrap();
    assert_eq!(files.file_names, vec![FILE_NAME]);

    let request = Request::builder()
        .uri(format!("/file/{FILE_NAME}"))
        .body(Body::empty())
        .unwrap();
    let response = test_app.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/parquet"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], contents);
}

#[tokio::test]
async fn rejects_upload_without_parquet_extension() {
    let test_app = spawn_app(Arc::new(MockObservationAccess::new())).await;
    let response = test_app
        .app
        .oneshot(upload_request("observations_2024-11-02T11:00:00Z.csv", b"a,b"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejects_upload_without_timestamp() {
    let test_app = spawn_app(Arc::new(MockObservationAccess::new())).await;
    let response = test_app
        .app
        .oneshot(upload_request("observations.parquet", b"PAR1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let test_app = spawn_app(Arc::new(MockObservationAccess::new())).await;
    let request = Request::builder()
        .uri(format!("/file/{FILE_NAME}"))
        .body(Body::empty())
        .unwrap();
    let response = test_app.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
