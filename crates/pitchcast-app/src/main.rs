// pitchcast: season feature tables, pitcher snapshots and inference vectors
// for next-pitch-type prediction.

use anyhow::Context;
use clap::Parser;
use pitchcast_core::config::{self, LoggingConfig};
use tracing::info;

mod command;

fn main() -> anyhow::Result<()> {
    let args = command::CommandArgs::parse();

    let config = config::load_config().context("failed to load configuration")?;

    // Log to file so command output on stdout stays clean.
    init_tracing(&config.logging)?;
    info!(
        "pitchcast starting: min_pitches={}, encoding={}",
        config.pipeline.min_pitches, config.training.encoding
    );

    command::run(args, &config)
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join(&logging.dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("pitchcast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
