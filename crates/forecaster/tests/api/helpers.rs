use async_trait::async_trait;
use axum::Router;
use duckdb::Connection;
use forecaster::{
    app, AppState, Error, FileAccess, Forecaster, Horizon, LinearModel, ModelContext, Observation,
    ObservationAccess, ObservationData, ObservationRequest, ScalerPair, Target, TargetPipeline,
    HORIZON,
};
use mockall::mock;
use skycast_core::{Scaler, Transform};
use std::{path::Path, sync::Arc};
use tempfile::TempDir;
use time::{format_description::well_known::Rfc3339, macros::datetime, Duration};

mock! {
    pub ObservationAccess {}
    #[async_trait]
    impl ObservationData for ObservationAccess {
        async fn latest_observations(&self, req: &ObservationRequest) -> Result<Vec<Observation>, Error>;
    }
}

pub struct TestApp {
    pub app: Router,
    pub data_dir: TempDir,
}

/// Per-target model output, ordered like `Target::ALL`
pub const PREDICTIONS: [Horizon; 5] = [
    [11.2, 11.8, 12.4, 12.9, 13.3],
    [0.0, 0.4, 1.26, -0.3, 0.0],
    [0.0, 0.0, 0.0, 0.0, 2.0],
    [20.0, 64.6, 35.0, 10.0, 90.0],
    [14.0, 15.54, 16.0, -2.0, 12.3],
];

fn identity(names: Vec<String>) -> Scaler {
    let width = names.len();
    Scaler::new(
        names,
        Transform::Standard {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        },
    )
    .unwrap()
}

/// Models that ignore their input and always return `PREDICTIONS`
pub fn model_context() -> ModelContext {
    let pipelines = Target::ALL
        .iter()
        .zip(PREDICTIONS)
        .map(|(target, output)| {
            let builder = target.feature_builder();
            let scalers = ScalerPair::new(
                identity(builder.feature_names()),
                identity((1..=HORIZON).map(|h| format!("t+{h}")).collect()),
            )
            .unwrap();
            let model =
                LinearModel::new(vec![vec![0.0; builder.width()]; HORIZON], output.to_vec())
                    .unwrap();
            TargetPipeline::new(*target, scalers, Box::new(model)).unwrap()
        })
        .collect();
    ModelContext::new(pipelines).unwrap()
}

pub async fn spawn_app(observation_db: Arc<dyn ObservationData>) -> TestApp {
    let data_dir = tempfile::tempdir().unwrap();
    let file_access = Arc::new(FileAccess::new(
        data_dir.path().to_string_lossy().to_string(),
    ));
    let app_state = AppState {
        file_access,
        observation_db,
        forecaster: Arc::new(Forecaster::new(Arc::new(model_context()))),
        locations: vec![
            "colchester".to_string(),
            "london".to_string(),
            "bristol".to_string(),
        ],
        window_size: 5,
        lookback: Duration::hours(48),
    };

    TestApp {
        app: app(app_state),
        data_dir,
    }
}

/// App reading observations from parquet files under its own data dir
pub async fn spawn_app_with_files() -> TestApp {
    let data_dir = tempfile::tempdir().unwrap();
    let file_access = Arc::new(FileAccess::new(
        data_dir.path().to_string_lossy().to_string(),
    ));
    let observation_db = Arc::new(ObservationAccess::new(file_access.clone()));
    let app_state = AppState {
        file_access,
        observation_db,
        forecaster: Arc::new(Forecaster::new(Arc::new(model_context()))),
        locations: vec!["london".to_string()],
        window_size: 5,
        // files are stamped relative to now so they stay inside the lookback
        lookback: Duration::hours(48),
    };

    TestApp {
        app: app(app_state),
        data_dir,
    }
}

/// Hourly observations from 2024-11-02T00:00Z, oldest first
pub fn observations(count: usize) -> Vec<Observation> {
    (0..count)
        .map(|i| {
            let observed_at = datetime!(2024-11-02 00:00 UTC) + Duration::hours(i as i64);
            Observation {
                observed_at,
                temperature_2m: 10.0 + i as f64 * 0.5,
                relative_humidity_2m: 82.0,
                apparent_temperature: 8.4,
                precipitation: 0.0,
                rain: 0.0,
                showers: 0.0,
                snowfall: 0.0,
                pressure_msl: 1018.3,
                surface_pressure: 1015.94,
                cloud_cover: 65.0,
                wind_speed_10m: 14.8,
                wind_direction_10m: 236.0,
                wind_gusts_10m: 31.3,
                is_day: true,
                year: 2024,
                month: 11,
                day: 2,
                hour: i as i64,
                cluster: 2,
            }
        })
        .collect()
}

/// Writes `rows` as an observations parquet file the way the daemon lays them out,
/// `<data_dir>/<date>/<file_name>`
pub fn write_observation_file(data_dir: &Path, file_name: &str, rows: &[(&str, &Observation)]) {
    let stamp = file_name
        .rsplit_once('_')
        .and_then(|(_, s)| s.strip_suffix(".parquet"))
        .unwrap();
    let generated_at = time::OffsetDateTime::parse(stamp, &Rfc3339).unwrap();
    let dir = data_dir.join(generated_at.date().to_string());
    std::fs::create_dir_all(&dir).unwrap();

    let values: Vec<String> = rows
        .iter()
        .map(|(location, o)| {
            format!(
                "('{}', '{}', {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                location,
                o.observed_at.format(&Rfc3339).unwrap(),
                o.temperature_2m,
                o.relative_humidity_2m,
                o.apparent_temperature,
                o.precipitation,
                o.rain,
                o.showers,
                o.snowfall,
                o.pressure_msl,
                o.surface_pressure,
                o.cloud_cover,
                o.wind_speed_10m,
                o.wind_direction_10m,
                o.wind_gusts_10m,
                o.is_day,
                o.year,
                o.month,
                o.day,
                o.hour,
                o.cluster
            )
        })
        .collect();

    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE observations (
            location VARCHAR, observed_at VARCHAR,
            temperature_2m DOUBLE, relative_humidity_2m DOUBLE, apparent_temperature DOUBLE,
            precipitation DOUBLE, rain DOUBLE, showers DOUBLE, snowfall DOUBLE,
            pressure_msl DOUBLE, surface_pressure DOUBLE, cloud_cover DOUBLE,
            wind_speed_10m DOUBLE, wind_direction_10m DOUBLE, wind_gusts_10m DOUBLE,
            is_day BOOLEAN, year BIGINT, month BIGINT, day BIGINT, hour BIGINT, cluster BIGINT
        );
        INSERT INTO observations VALUES {};
        COPY observations TO '{}' (FORMAT PARQUET);
        "#,
        values.join(", "),
        dir.join(file_name).display()
    ))
    .unwrap();
}
