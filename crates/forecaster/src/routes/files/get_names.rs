use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{AppState, FileParams};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Files {
    pub file_names: Vec<String>,
}

#[utoipa::path(
    get,
    path = "files",
    params(FileParams),
    responses(
        (status = OK, description = "Stored observation files in the requested range", body = Files),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to list files")
    ))]
pub async fn files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileParams>,
) -> Result<Json<Files>, (StatusCode, String)> {
    let file_names = state
        .file_access
        .grab_file_names(params)
        .await
        .map_err(|e| {
            error!("error listing files: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to list files: {}", e),
            )
        })?;
    Ok(Json(Files { file_names }))
}
