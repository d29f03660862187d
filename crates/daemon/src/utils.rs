use anyhow::{anyhow, Error};
use clap::Parser;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use skycast_core::{
    default_locations, load_config, ConfigSource, Location,
    DEFAULT_FETCH_INTERVAL, DEFAULT_FORECASTER_PORT,
};
use slog::{debug, o, Drain, Level, Logger};
use std::{
    env,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Skycast Daemon - Fetches current conditions and uploads them to the forecaster"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $SKYCAST_DAEMON_CONFIG, ./daemon.toml,
    /// $XDG_CONFIG_HOME/skycast/daemon.toml, /etc/skycast/daemon.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "SKYCAST_DAEMON_LEVEL")]
    pub level: Option<String>,

    /// Forecaster server URL to upload parquet files to
    #[arg(short, long, env = "SKYCAST_DAEMON_BASE_URL")]
    pub base_url: Option<String>,

    /// Local directory for parquet storage before upload
    #[arg(short, long, env = "SKYCAST_DAEMON_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Fetch interval in seconds (one observation row per location per run)
    #[arg(short, long, env = "SKYCAST_DAEMON_SLEEP_INTERVAL")]
    pub sleep_interval: Option<u64>,

    /// Rate limiter refill rate in tokens per second
    #[arg(short, long, env = "SKYCAST_DAEMON_REFILL_RATE")]
    pub refill_rate: Option<f64>,

    /// Rate limiter token capacity
    #[arg(short, long, env = "SKYCAST_DAEMON_TOKEN_CAPACITY")]
    pub token_capacity: Option<usize>,

    /// HTTP User-Agent header for weather API requests
    #[arg(short, long, env = "SKYCAST_DAEMON_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Open-Meteo forecast endpoint
    #[arg(short, long, env = "SKYCAST_DAEMON_API_URL")]
    pub api_url: Option<String>,

    /// Path to the fitted clustering artifact (JSON)
    #[arg(long, env = "SKYCAST_DAEMON_CLUSTER_MODEL")]
    pub cluster_model: Option<String>,

    /// Observed locations; only settable from the config file
    #[arg(skip)]
    pub locations: Option<Vec<Location>>,
}

impl Cli {
    /// Get the effective configuration value with defaults
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", DEFAULT_FORECASTER_PORT))
    }

    pub fn data_dir(&self) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| "./data".to_string())
    }

    pub fn sleep_interval(&self) -> u64 {
        self.sleep_interval.unwrap_or(DEFAULT_FETCH_INTERVAL)
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate.unwrap_or(1.0)
    }

    pub fn token_capacity(&self) -> usize {
        self.token_capacity.unwrap_or(3)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("skycast-daemon/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| OPEN_METEO_URL.to_string())
    }

    pub fn cluster_model(&self) -> String {
        self.cluster_model
            .clone()
            .unwrap_or_else(|| "./artifacts/models/cluster_model.json".to_string())
    }

    pub fn locations(&self) -> Vec<Location> {
        self.locations.clone().unwrap_or_else(default_locations)
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Result<Cli, Error> {
    resolve_config(Cli::parse())
}

/// CLI args override the config file (env vars are handled by clap). A file
/// that was asked for but cannot be read or parsed stops the daemon.
pub fn resolve_config(cli_args: Cli) -> Result<Cli, Error> {
    let source = ConfigSource::resolve(
        cli_args.config.as_deref(),
        "SKYCAST_DAEMON_CONFIG",
        "daemon.toml",
    );
    let file_config: Cli = load_config(&source)?;
    Ok(merge_config(cli_args, file_config))
}

fn merge_config(cli_args: Cli, file_config: Cli) -> Cli {
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        base_url: cli_args.base_url.or(file_config.base_url),
        data_dir: cli_args.data_dir.or(file_config.data_dir),
        sleep_interval: cli_args.sleep_interval.or(file_config.sleep_interval),
        refill_rate: cli_args.refill_rate.or(file_config.refill_rate),
        token_capacity: cli_args.token_capacity.or(file_config.token_capacity),
        user_agent: cli_args.user_agent.or(file_config.user_agent),
        api_url: cli_args.api_url.or(file_config.api_url),
        cluster_model: cli_args.cluster_model.or(file_config.cluster_model),
        locations: cli_args.locations.or(file_config.locations),
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let log_level = match cli.level.as_ref() {
        Some(level) => parse_level(level),
        None => parse_level(&env::var("RUST_LOG").unwrap_or_default()),
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Token bucket guarding the third-party weather API
pub struct RateLimiter {
    capacity: usize,
    tokens: f64,
    last_refill: Instant,
    refill_rate: f64,
    retry_wait: Duration,
}

impl RateLimiter {
    pub fn new(capacity: usize, refill_rate: f64) -> Self {
        RateLimiter {
            capacity,
            tokens: capacity as f64,
            last_refill: Instant::now(),
            refill_rate,
            retry_wait: Duration::from_secs(20),
        }
    }

    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    fn refill_tokens(&mut self) {
        let now = Instant::now();
        let elapsed_time = now.duration_since(self.last_refill).as_secs_f64();
        let tokens_to_add = elapsed_time * self.refill_rate;

        self.tokens = (self.tokens + tokens_to_add).min(self.capacity as f64);
        self.last_refill = now;
    }

    pub async fn try_acquire(&mut self, tokens: f64) -> bool {
        let mut retries = 0;

        loop {
            self.refill_tokens();

            if tokens <= self.tokens {
                self.tokens -= tokens;
                return true;
            }
            if retries >= 3 {
                return false;
            }
            retries += 1;
            tokio::time::sleep(self.retry_wait).await;
        }
    }
}

/// Rate-limited JSON client with exponential-backoff retries on transient failures
pub struct JsonFetcher {
    logger: Logger,
    client: ClientWithMiddleware,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl JsonFetcher {
    pub fn new(
        logger: Logger,
        user_agent: String,
        rate_limiter: Arc<Mutex<RateLimiter>>,
    ) -> Result<JsonFetcher, Error> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(
            Client::builder()
                .user_agent(user_agent)
                .timeout(Duration::from_secs(20))
                .build()?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Ok(Self {
            logger,
            client,
            rate_limiter,
        })
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        {
            let mut limiter = self.rate_limiter.lock().await;
            if !limiter.try_acquire(1.0).await {
                return Err(anyhow!("Rate limit exceeded after retries"));
            }
        }

        debug!(self.logger, "requesting: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("error sending request: {}", e))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "error response from request: {}",
                response.status()
            ));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| anyhow!("error parsing body of request: {}", e))
    }
}

pub fn get_full_path(relative_path: &str) -> Result<String, Error> {
    let mut current_dir = env::current_dir()?;
    current_dir.push(relative_path);
    Ok(current_dir.to_string_lossy().to_string())
}
