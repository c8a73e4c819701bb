use argh::FromArgs;
use chrono::Utc;
use std::path::PathBuf;
use tokio::sync::watch;

use weather_pipeline::scheduler::{hour_slot, run_scheduler};
use weather_pipeline::{Credentials, Pipeline, PipelineConfig, TriggerTimestamp};

/// Fetch current weather on a schedule and store it in blob storage.
#[derive(FromArgs)]
struct Args {
    /// path to the pipeline configuration file (defaults apply if missing)
    #[argh(option, short = 'c', default = "default_config_path()")]
    config: PathBuf,

    /// run the pipeline once and exit instead of following the schedule
    #[argh(switch)]
    once: bool,

    /// logical trigger timestamp for --once (default: current hour, UTC)
    #[argh(option, short = 't')]
    trigger: Option<String>,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("configs/weather_pipeline.yaml")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    log::info!("Loading config from: {}", args.config.display());
    let config = PipelineConfig::load_or_default(&args.config)?;
    let credentials = Credentials::from_env(&config.credentials)?;
    log::info!(
        "Location: ({:.5}, {:.5}), schedule: {}",
        config.location.latitude,
        config.location.longitude,
        config.schedule.cron
    );

    let pipeline = Pipeline::from_config(&config, &credentials)?;

    if args.once {
        let trigger = args
            .trigger
            .map(TriggerTimestamp::new)
            .unwrap_or_else(|| TriggerTimestamp::from_datetime(hour_slot(Utc::now())));
        let summary = pipeline.run(&trigger).await?;
        log::info!("Stored {}/{}", summary.container, summary.key);
        return Ok(());
    }

    if args.trigger.is_some() {
        log::warn!("--trigger is only used together with --once, ignoring");
    }

    // Graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    ctrlc::set_handler(move || {
        log::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    })?;

    run_scheduler(&pipeline, &config.schedule.cron, shutdown_rx).await?;

    log::info!("Weather pipeline shut down, exiting");
    Ok(())
}
