use async_trait::async_trait;
use axum::body::Body;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};
use tokio::fs;
use tokio_util::io::ReaderStream;
use utoipa::IntoParams;

/// Prefix of the parquet files written by the ingestion daemon
pub const OBSERVATIONS_PREFIX: &str = "observations";

#[derive(Clone, Debug, Default, Deserialize, Serialize, IntoParams)]
pub struct FileParams {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
}

pub struct FileAccess {
    data_dir: String,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to parse time string: {0}")]
    TimeParse(#[from] time::error::Parse),
    #[error("Invalid file name: {0}")]
    InvalidName(String),
    #[error("File not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait FileData: Send + Sync {
    /// Observation files whose embedded timestamp falls inside `params`
    async fn grab_file_names(&self, params: FileParams) -> Result<Vec<String>, Error>;
    fn build_file_paths(&self, file_names: Vec<String>) -> Vec<String>;
    fn build_file_path(&self, filename: &str, file_generated_at: OffsetDateTime) -> String;
    /// Stream a stored file back as an axum Body
    async fn download_file(
        &self,
        filename: &str,
        file_generated_at: OffsetDateTime,
    ) -> Result<Body, Error>;
}

impl FileAccess {
    pub fn new(data_dir: String) -> Self {
        Self { data_dir }
    }

    fn add_filename(&self, entry: fs::DirEntry, params: &FileParams) -> Option<String> {
        let filename = entry.file_name().to_str()?.to_owned();
        match matches_file_params(&filename, params) {
            Ok(true) => Some(filename),
            Ok(false) => None,
            Err(e) => {
                warn!("skipping {}: {}", filename, e);
                None
            }
        }
    }
}

#[async_trait]
impl FileData for FileAccess {
    fn build_file_paths(&self, file_names: Vec<String>) -> Vec<String> {
        file_names
            .iter()
            .filter_map(|file_name| match parse_file_timestamp(file_name) {
                Ok(file_generated_at) => Some(self.build_file_path(file_name, file_generated_at)),
                Err(e) => {
                    warn!("ignoring {}: {}", file_name, e);
                    None
                }
            })
            .collect()
    }

    fn build_file_path(&self, filename: &str, file_generated_at: OffsetDateTime) -> String {
        format!(
            "{}/{}/{}",
            self.data_dir,
            file_generated_at.date(),
            filename
        )
    }

    async fn download_file(
        &self,
        filename: &str,
        file_generated_at: OffsetDateTime,
    ) -> Result<Body, Error> {
        let file_path = self.build_file_path(filename, file_generated_at);
        let file = fs::File::open(&file_path)
            .await
            .map_err(|e| Error::NotFound(format!("{}: {}", file_path, e)))?;
        let stream = ReaderStream::new(file);
        Ok(Body::from_stream(stream))
    }

    async fn grab_file_names(&self, params: FileParams) -> Result<Vec<String>, Error> {
        let mut files_names = vec![];
        if let Ok(mut entries) = fs::read_dir(&self.data_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let Some(date) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                let format = format_description!("[year]-[month]-[day]");
                let Ok(directory_date) = Date::parse(&date, &format) else {
                    trace!("skipping non-date directory {}", date);
                    continue;
                };
                if !is_date_in_range(directory_date, &params) {
                    continue;
                }

                if let Ok(mut subentries) = fs::read_dir(path).await {
                    while let Ok(Some(subentry)) = subentries.next_entry().await {
                        if let Some(filename) = self.add_filename(subentry, &params) {
                            files_names.push(filename);
                        }
                    }
                }
            }
        }
        files_names.sort();
        Ok(files_names)
    }
}

/// Timestamp after the last `_` of a name like
/// `observations_2024-11-02T11:00:00Z.parquet`
pub fn parse_file_timestamp(file_name: &str) -> Result<OffsetDateTime, Error> {
    let (_, stamp) = file_name
        .rsplit_once('_')
        .ok_or_else(|| Error::InvalidName(format!("{}: missing underscore", file_name)))?;
    let stamp = stamp
        .strip_suffix(".parquet")
        .ok_or_else(|| Error::InvalidName(format!("{}: missing .parquet suffix", file_name)))?;
    Ok(OffsetDateTime::parse(stamp, &Rfc3339)?)
}

fn is_date_in_range(compare_to: Date, params: &FileParams) -> bool {
    let after_start = params
        .start
        .map(|start| compare_to >= start.date())
        .unwrap_or(true);
    let before_end = params
        .end
        .map(|end| compare_to <= end.date())
        .unwrap_or(true);
    after_start && before_end
}

fn is_time_in_range(compare_to: OffsetDateTime, params: &FileParams) -> bool {
    let after_start = params
        .start
        .map(|start| compare_to >= start)
        .unwrap_or(true);
    let before_end = params.end.map(|end| compare_to <= end).unwrap_or(true);
    after_start && before_end
}

fn matches_file_params(filename: &str, params: &FileParams) -> Result<bool, Error> {
    if !filename.starts_with(OBSERVATIONS_PREFIX) {
        return Ok(false);
    }
    let file_generated_at = parse_file_timestamp(filename)?;
    trace!("parsed file time: {}", file_generated_at);
    Ok(is_time_in_range(file_generated_at, params))
}
