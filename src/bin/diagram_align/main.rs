use std::{
    fs::{self, File},
    path::PathBuf,
    sync::Arc,
};

use chrono::Utc;
use clap::Parser as _;
use color_eyre::eyre::{self, OptionExt as _};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::subcommand::Subcommand;

mod subcommand;
mod tui;

/// Snap approximate diagram annotations onto what is drawn in an image.
///
/// The aligned annotation is printed to stdout as JSON.
#[derive(clap::Parser, Debug)]
#[command(version)]
struct Args {
    #[clap(flatten)]
    log_args: LogArgs,
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(clap::Parser, Debug)]
struct LogArgs {
    /// Filter for messages written to stderr [default: `RUST_LOG` or `warn`]
    #[clap(long, value_parser = parse_filter_arg)]
    console_filter: Option<Arc<EnvFilter>>,
    /// Also write a JSON log file into `--log-dir`
    #[clap(long, default_value = "false")]
    emit_log: bool,
    #[clap(long, default_value = "log")]
    log_dir: PathBuf,
    /// Filter for the log file [default: `RUST_LOG` or `debug`]
    #[clap(long, value_parser = parse_filter_arg)]
    log_filter: Option<Arc<EnvFilter>>,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let Args {
        log_args,
        subcommand,
    } = Args::parse();

    init_log(log_args)?;

    subcommand.run()?;

    Ok(())
}

fn init_log(args: LogArgs) -> eyre::Result<()> {
    let LogArgs {
        console_filter,
        emit_log,
        log_dir,
        log_filter,
    } = args;

    let indicatif_layer = IndicatifLayer::new();
    let console_filter = match console_filter {
        Some(f) => Arc::into_inner(f).ok_or_eyre("console filter is shared")?,
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy(),
    };
    let console_layer = fmt::layer()
        .with_timer(fmt::time::Uptime::default())
        .with_target(false)
        .with_writer(indicatif_layer.get_stderr_writer())
        .with_filter(console_filter);

    let log_filter = match log_filter {
        Some(f) => Arc::into_inner(f).ok_or_eyre("log filter is shared")?,
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::DEBUG.into())
            .from_env_lossy(),
    };

    let error_layer = ErrorLayer::default();

    let log_layer = emit_log
        .then(|| -> eyre::Result<_> {
            let timestamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
            let log_path = log_dir.join(format!("diagram-align_{timestamp}.jsonl"));
            fs::create_dir_all(&log_dir)?;
            let log_file = File::create(log_path)?;

            let layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(Arc::new(log_file))
                .with_filter(log_filter);
            Ok(layer)
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(console_layer)
        .with(log_layer)
        .with(indicatif_layer)
        .with(error_layer)
        .init();

    Ok(())
}

fn parse_filter_arg(s: &str) -> eyre::Result<Arc<EnvFilter>> {
    let filter = EnvFilter::try_new(s)?;
    Ok(Arc::new(filter))
}
