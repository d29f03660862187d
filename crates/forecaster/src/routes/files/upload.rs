use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use log::{error, info};
use std::sync::Arc;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::{parse_file_timestamp, AppState};
use skycast_core::create_dir_all;

#[utoipa::path(
    post,
    path = "file/{file_name}",
    params(
         ("file_name" = String, Path, description = "Name of file to upload"),
    ),
    responses(
        (status = OK, description = "Successfully stored observations file"),
        (status = BAD_REQUEST, description = "Invalid file"),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to save file")
    ))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
    mut multipart: Multipart,
) -> Result<(), (StatusCode, String)> {
    if !path_is_valid(&file_name) {
        return Err((StatusCode::BAD_REQUEST, "Invalid file".to_owned()));
    }
    let file_generated_at = parse_file_timestamp(&file_name).map_err(|err| {
        error!("error parsing timestamp from filename: {}", err);
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to parse timestamp from filename: {}", err),
        )
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!("error reading multipart body: {}", err);
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid multipart body: {}", err),
        )
    })? {
        let data = field.bytes().await.map_err(|err| {
            error!("error getting file's bytes: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to get file's bytes: {}", err),
            )
        })?;

        info!(
            "length of `{}` is {} mb",
            file_name,
            bytes_to_mb(data.len())
        );

        // stored under the date the file was generated
        let path = state
            .file_access
            .build_file_path(&file_name, file_generated_at);

        if let Some(parent) = std::path::Path::new(&path).parent() {
            create_dir_all(parent.to_str().unwrap_or_default()).map_err(|err| {
                error!("error creating directory: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to create directory: {}", err),
                )
            })?;
        }

        let mut file = File::create(&path).await.map_err(|err| {
            error!("error creating file: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create file: {}", err),
            )
        })?;
        file.write_all(&data).await.map_err(|err| {
            error!("error writing file: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to write to file: {}", err),
            )
        })?;
    }

    Ok(())
}

fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / 1_048_576.0
}

// to prevent directory traversal attacks we ensure the path consists of exactly one normal component
fn path_is_valid(path: &str) -> bool {
    let path = std::path::Path::new(path);

    let mut components = path.components().peekable();

    if let Some(first) = components.peek() {
        if !matches!(first, std::path::Component::Normal(_)) {
            return false;
        }
    }

    components.count() == 1 && is_parquet_file(path)
}

fn is_parquet_file(path: &std::path::Path) -> bool {
    path.extension()
        .map(|extension| extension == "parquet")
        .unwrap_or(false)
}
