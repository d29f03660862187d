use async_trait::async_trait;
use duckdb::{
    arrow::array::{Array, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray},
    params_from_iter, Connection,
};
use log::debug;
use regex::Regex;
use scooby::postgres::{select, Parameters, Select};
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{file_access, FileData, FileParams, Observation};

/// Which observations a forecast needs
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRequest {
    pub location: String,
    /// Newest rows to return
    pub limit: usize,
    /// Files generated before this are not scanned
    pub start: Option<OffsetDateTime>,
}

impl From<&ObservationRequest> for FileParams {
    fn from(value: &ObservationRequest) -> Self {
        FileParams {
            start: value.start,
            end: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to query duckdb: {0}")]
    Query(#[from] duckdb::Error),
    #[error("Failed to parse time string: {0}")]
    TimeParse(#[from] time::error::Parse),
    #[error("Failed to access files: {0}")]
    FileAccess(#[from] file_access::Error),
    #[error("Unexpected type for column `{0}`")]
    ColumnType(&'static str),
    #[error("Null value in column `{0}`")]
    NullValue(&'static str),
    #[error("Failed to rewrite query placeholders: {0}")]
    Placeholder(#[from] regex::Error),
}

#[async_trait]
pub trait ObservationData: Sync + Send {
    /// The newest `limit` observations for a location, oldest first
    async fn latest_observations(&self, req: &ObservationRequest)
        -> Result<Vec<Observation>, Error>;
}

pub struct ObservationAccess {
    file_access: Arc<dyn FileData>,
}

const DOUBLE_COLUMNS: [&str; 13] = [
    "temperature_2m",
    "relative_humidity_2m",
    "apparent_temperature",
    "precipitation",
    "rain",
    "showers",
    "snowfall",
    "pressure_msl",
    "surface_pressure",
    "cloud_cover",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
];

const INTEGER_COLUMNS: [&str; 5] = ["year", "month", "day", "hour", "cluster"];

fn selected_columns() -> String {
    let mut columns = vec!["observed_at::VARCHAR AS observed_at".to_string()];
    columns.extend(
        DOUBLE_COLUMNS
            .iter()
            .map(|c| format!("{c}::DOUBLE AS {c}")),
    );
    columns.push("is_day::BOOLEAN AS is_day".to_string());
    columns.extend(
        INTEGER_COLUMNS
            .iter()
            .map(|c| format!("{c}::BIGINT AS {c}")),
    );
    columns.join(", ")
}

impl ObservationAccess {
    pub fn new(file_access: Arc<dyn FileData>) -> Self {
        Self { file_access }
    }

    /// Creates new in-memory connection, making it so we always start with a fresh slate and no possible locking issues
    pub fn open_connection(&self) -> Result<Connection, duckdb::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("INSTALL parquet; LOAD parquet;")?;
        Ok(conn)
    }

    pub async fn query(&self, sql: &str, params: Vec<String>) -> Result<Vec<RecordBatch>, Error> {
        // duckdb binds `?`, scooby renders `$n`
        let re = Regex::new(r"\$(\d+)")?;
        let fixed_params = re.replace_all(sql, "?");
        let conn = self.open_connection()?;
        let mut stmt = conn.prepare(&fixed_params)?;
        let sql_params = params_from_iter(params.iter());
        Ok(stmt.query_arrow(sql_params)?.collect())
    }

    fn build_query(file_paths: &[String], placeholders: &mut Parameters) -> Select {
        select(selected_columns())
            .from(format!(
                "read_parquet(['{}'], union_by_name = true)",
                file_paths.join("', '")
            ))
            .where_(format!("lower(location) = lower({})", placeholders.next()))
    }
}

#[async_trait]
impl ObservationData for ObservationAccess {
    async fn latest_observations(
        &self,
        req: &ObservationRequest,
    ) -> Result<Vec<Observation>, Error> {
        let parquet_files = self.file_access.grab_file_names(req.into()).await?;
        let file_paths = self.file_access.build_file_paths(parquet_files);
        if file_paths.is_empty() || req.limit == 0 {
            return Ok(vec![]);
        }

        let mut placeholders = Parameters::new();
        let base_query = Self::build_query(&file_paths, &mut placeholders);
        // newest first so LIMIT keeps the most recent rows
        let sql = format!(
            "{} ORDER BY observed_at DESC LIMIT {}",
            base_query, req.limit
        );
        debug!("observation query over {} files: {}", file_paths.len(), sql);

        let records = self.query(&sql, vec![req.location.clone()]).await?;
        let mut observations = Vec::new();
        for record in &records {
            observations.extend(observations_from_batch(record)?);
        }
        observations.sort_by_key(|o| o.observed_at);
        observations.dedup_by_key(|o| o.observed_at);
        Ok(observations)
    }
}

fn column<'a, T: 'static>(record: &'a RecordBatch, name: &'static str) -> Result<&'a T, Error> {
    record
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or(Error::ColumnType(name))
}

fn doubles(record: &RecordBatch, name: &'static str) -> Result<Vec<f64>, Error> {
    let values = column::<Float64Array>(record, name)?;
    if values.null_count() > 0 {
        return Err(Error::NullValue(name));
    }
    Ok(values.values().to_vec())
}

fn integers(record: &RecordBatch, name: &'static str) -> Result<Vec<i64>, Error> {
    let values = column::<Int64Array>(record, name)?;
    if values.null_count() > 0 {
        return Err(Error::NullValue(name));
    }
    Ok(values.values().to_vec())
}

fn observations_from_batch(record: &RecordBatch) -> Result<Vec<Observation>, Error> {
    let observed_at = column::<StringArray>(record, "observed_at")?;
    let is_day = column::<BooleanArray>(record, "is_day")?;
    if observed_at.null_count() > 0 {
        return Err(Error::NullValue("observed_at"));
    }
    if is_day.null_count() > 0 {
        return Err(Error::NullValue("is_day"));
    }

    let d: Vec<Vec<f64>> = DOUBLE_COLUMNS
        .iter()
        .map(|name| doubles(record, name))
        .collect::<Result<_, _>>()?;
    let n: Vec<Vec<i64>> = INTEGER_COLUMNS
        .iter()
        .map(|name| integers(record, name))
        .collect::<Result<_, _>>()?;

    (0..record.num_rows())
        .map(|row| {
            Ok(Observation {
                observed_at: OffsetDateTime::parse(observed_at.value(row), &Rfc3339)?,
                temperature_2m: d[0][row],
                relative_humidity_2m: d[1][row],
                apparent_temperature: d[2][row],
                precipitation: d[3][row],
                rain: d[4][row],
                showers: d[5][row],
                snowfall: d[6][row],
                pressure_msl: d[7][row],
                surface_pressure: d[8][row],
                cloud_cover: d[9][row],
                wind_speed_10m: d[10][row],
                wind_direction_10m: d[11][row],
                wind_gusts_10m: d[12][row],
                is_day: is_day.value(row),
                year: n[0][row],
                month: n[1][row],
                day: n[2][row],
                hour: n[3][row],
                cluster: n[4][row],
            })
        })
        .collect()
}
