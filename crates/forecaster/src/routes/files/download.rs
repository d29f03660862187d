use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
};
use hyper::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    HeaderMap,
};
use log::error;
use std::sync::Arc;

use crate::{parse_file_timestamp, AppState};

#[utoipa::path(
    get,
    path = "file/{file_name}",
    params(
         ("file_name" = String, Path, description = "Name of file to download"),
    ),
    responses(
        (status = OK, description = "Successfully retrieved file", content_type = "application/parquet", body = Vec<u8>),
        (status = BAD_REQUEST, description = "Invalid file name"),
        (status = NOT_FOUND, description = "No file stored under that name")
    ))]
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<(HeaderMap, Body), (StatusCode, String)> {
    let file_generated_at = parse_file_timestamp(&file_name).map_err(|e| {
        error!("error requested file name has no valid timestamp: {}", e);
        (
            StatusCode::BAD_REQUEST,
            format!("Badly formatted filename: {}", e),
        )
    })?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid file name: {}", e)))?;

    let body = state
        .file_access
        .download_file(&file_name, file_generated_at)
        .await
        .map_err(|err| {
            error!("error downloading file: {}", err);
            (StatusCode::NOT_FOUND, format!("File not found: {}", err))
        })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/parquet"),
    );
    headers.insert(CONTENT_DISPOSITION, disposition);

    Ok((headers, body))
}
