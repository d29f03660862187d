use daemon::{
    get_config_info, save_observations, send_parquet_file, setup_logger, Cli, ClusterModel,
    JsonFetcher, ObservationService, RateLimiter,
};
use skycast_core::{dated_dir, ensure_dir_exists};
use slog::{debug, error, info, warn, Logger};
use std::{sync::Arc, time::Duration};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::Mutex;
use tokio::time::interval;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = get_config_info()?;
    let logger = setup_logger(&cli);

    info!(logger, "Skycast Daemon starting...");
    info!(logger, "  Forecaster URL: {}", cli.base_url());
    info!(logger, "  Data dir: {}", cli.data_dir());
    info!(logger, "  Fetch interval: {} seconds", cli.sleep_interval());

    // Loaded once; a broken artifact stops the daemon before it writes anything
    let cluster_model = Arc::new(ClusterModel::load(cli.cluster_model()).map_err(|e| {
        error!(logger, "error loading cluster model: {}", e);
        e
    })?);
    info!(
        logger,
        "  Cluster model: {} ({} clusters)",
        cli.cluster_model(),
        cluster_model.num_clusters()
    );

    let rate_limiter = Arc::new(Mutex::new(RateLimiter::new(
        cli.token_capacity(),
        cli.refill_rate(),
    )));

    process_weather_data_hourly(cli, logger, rate_limiter, cluster_model).await;
    Ok(())
}

async fn process_weather_data_hourly(
    cli: Cli,
    logger: Logger,
    rate_limit: Arc<Mutex<RateLimiter>>,
    cluster_model: Arc<ClusterModel>,
) {
    let sleep_between_checks = cli.sleep_interval();
    info!(
        logger,
        "Wait time between data pulls: {} seconds", sleep_between_checks
    );

    let mut check_channel_interval = interval(Duration::from_secs(sleep_between_checks));
    loop {
        tokio::select! {
            _ = check_channel_interval.tick() => {
                match process_data(&cli, logger.clone(), rate_limit.clone(), cluster_model.clone()).await {
                    Ok(_) => info!(logger, "Finished processing data, waiting {} seconds for next run", sleep_between_checks),
                    Err(err) => error!(&logger, "Error processing data: {}", err)
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(logger, "Shutting down");
                break;
            }
        }
    }
}

async fn process_data(
    cli: &Cli,
    logger: Logger,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    cluster_model: Arc<ClusterModel>,
) -> Result<(), anyhow::Error> {
    let fetcher = Arc::new(JsonFetcher::new(
        logger.clone(),
        cli.user_agent(),
        rate_limiter,
    )?);

    let observation_service =
        ObservationService::new(logger.clone(), fetcher, cli.api_url(), cluster_model);
    let observations = observation_service
        .get_observations(&cli.locations())
        .await;
    debug!(logger, "observations count: {}", observations.len());
    if observations.is_empty() {
        warn!(logger, "no location returned data, nothing to upload");
        return Ok(());
    }

    let now = OffsetDateTime::now_utc();
    let current_utc_time: String = now.format(&Rfc3339)?;
    let subfolder = dated_dir(&cli.data_dir(), now.date())
        .to_string_lossy()
        .to_string();
    if !ensure_dir_exists(&subfolder) {
        return Err(anyhow::anyhow!("unable to create {}", subfolder));
    }

    let observation_parquet = save_observations(
        &logger,
        &observations,
        &subfolder,
        &format!("{}_{}", "observations", current_utc_time),
    )?;

    send_parquet_file(&cli.base_url(), &logger, &observation_parquet).await?;
    Ok(())
}
