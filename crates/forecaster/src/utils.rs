use clap::Parser;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use skycast_core::{default_location_names, load_config, ConfigSource, DEFAULT_FORECASTER_PORT};
use std::env;
use time::{format_description::well_known::Iso8601, OffsetDateTime};

use crate::ForecasterSettings;

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Skycast Forecaster - short-horizon weather forecasts from stored observations"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $SKYCAST_FORECASTER_CONFIG, ./forecaster.toml,
    /// $XDG_CONFIG_HOME/skycast/forecaster.toml, /etc/skycast/forecaster.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "SKYCAST_FORECASTER_LEVEL")]
    pub level: Option<String>,

    /// Host to listen on (use 0.0.0.0 for all interfaces)
    #[arg(short, long, env = "SKYCAST_FORECASTER_HOST")]
    #[serde(alias = "host")]
    pub domain: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SKYCAST_FORECASTER_PORT")]
    pub port: Option<String>,

    /// Directory holding the uploaded observation parquet files
    #[arg(long, env = "SKYCAST_FORECASTER_DATA_DIR")]
    #[serde(alias = "weather_dir")]
    pub data_dir: Option<String>,

    /// Directory holding `models/` and `scalers/` artifacts
    #[arg(short, long, env = "SKYCAST_FORECASTER_MODEL_DIR")]
    pub model_dir: Option<String>,

    /// Most recent observations read per forecast
    #[arg(short, long, env = "SKYCAST_FORECASTER_WINDOW_SIZE")]
    pub window_size: Option<usize>,

    /// How many hours of observation files are scanned per forecast
    #[arg(long, env = "SKYCAST_FORECASTER_LOOKBACK_HOURS")]
    pub lookback_hours: Option<i64>,

    /// Comma separated location identifiers that can be forecast
    #[arg(long, env = "SKYCAST_FORECASTER_LOCATIONS", value_delimiter = ',')]
    pub locations: Option<Vec<String>>,
}

impl Cli {
    /// Get the effective configuration value with defaults
    pub fn host(&self) -> String {
        self.domain
            .clone()
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> String {
        self.port
            .clone()
            .unwrap_or_else(|| DEFAULT_FORECASTER_PORT.to_string())
    }

    pub fn data_dir(&self) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| "./weather_data".to_string())
    }

    pub fn model_dir(&self) -> String {
        self.model_dir
            .clone()
            .unwrap_or_else(|| "./artifacts".to_string())
    }

    pub fn window_size(&self) -> usize {
        self.window_size.unwrap_or(5)
    }

    pub fn lookback_hours(&self) -> i64 {
        self.lookback_hours.unwrap_or(48)
    }

    pub fn locations(&self) -> Vec<String> {
        self.locations
            .clone()
            .unwrap_or_else(default_location_names)
    }

    pub fn settings(&self) -> ForecasterSettings {
        ForecasterSettings {
            data_dir: self.data_dir(),
            model_dir: self.model_dir(),
            locations: self.locations(),
            window_size: self.window_size(),
            lookback_hours: self.lookback_hours(),
        }
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> anyhow::Result<Cli> {
    resolve_config(Cli::parse())
}

/// Layers the config file under already-parsed args. An unreadable or
/// malformed file is an error, never a silent fall back to defaults.
pub fn resolve_config(cli_args: Cli) -> anyhow::Result<Cli> {
    let source = ConfigSource::resolve(
        cli_args.config.as_deref(),
        "SKYCAST_FORECASTER_CONFIG",
        "forecaster.toml",
    );
    if let Some(path) = source.path() {
        log::info!("Loading config from: {}", path.display());
    }

    let file_config: Cli = load_config(&source)?;
    Ok(merge_config(cli_args, file_config))
}

/// CLI args (and env vars, handled by clap) override file config
pub fn merge_config(cli_args: Cli, file_config: Cli) -> Cli {
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        domain: cli_args.domain.or(file_config.domain),
        port: cli_args.port.or(file_config.port),
        data_dir: cli_args.data_dir.or(file_config.data_dir),
        model_dir: cli_args.model_dir.or(file_config.model_dir),
        window_size: cli_args.window_size.or(file_config.window_size),
        lookback_hours: cli_args.lookback_hours.or(file_config.lookback_hours),
        locations: cli_args.locations.or(file_config.locations),
    }
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logger() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or_default();
            out.finish(format_args!(
                "[{} {}] {}: {}",
                now,
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout())
}
