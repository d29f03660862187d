use std::path::Path;

use anyhow::{anyhow, Error};
use reqwest::{multipart, Body, Client};
use slog::{error, info, Logger};
use tokio::fs::File as TokioFile;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::get_full_path;

/// Uploads one observations file to `<base_url>/file/<name>`
pub async fn send_parquet_file(
    base_url: &str,
    logger: &Logger,
    relative_file_path: &str,
) -> Result<(), Error> {
    let file_name = Path::new(relative_file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid observation path: {}", relative_file_path))?;
    let full_path = get_full_path(relative_file_path)?;
    let url = format!("{}/file/{}", base_url.trim_end_matches('/'), file_name);

    send_file_to_endpoint(logger, &full_path, file_name, &url).await
}

async fn send_file_to_endpoint(
    logger: &Logger,
    file_path: &str,
    file_name: &str,
    endpoint_url: &str,
) -> Result<(), Error> {
    let client = Client::new();

    let file = TokioFile::open(file_path)
        .await
        .map_err(|e| anyhow!("error opening file to upload: {}", e))?;

    let stream = FramedRead::new(file, BytesCodec::new());
    let file_body = Body::wrap_stream(stream);

    let parquet_file = multipart::Part::stream(file_body)
        .file_name(file_name.to_owned())
        .mime_str("application/parquet")?;

    let form = multipart::Form::new().part("file", parquet_file);

    info!(logger, "sending file to endpoint: {}", endpoint_url);
    let response = client
        .post(endpoint_url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| anyhow!("error sending file to api: {}", e))?;

    if response.status().is_success() {
        info!(logger, "file successfully uploaded.");
        Ok(())
    } else {
        error!(
            logger,
            "failed to upload the file. status code: {:?}",
            response.status()
        );
        Err(anyhow!("upload rejected with status {}", response.status()))
    }
}
