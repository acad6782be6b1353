//! Tracing subscriber setup.
//!
//! Logs go to stderr (pretty or JSON) and, when a log directory is
//! configured, to a daily-rolling file as well. `RUST_LOG` always wins over
//! the default level; `--verbose` lowers the default to `debug`.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogFormat, RundockConfig};

const LOG_FILE_PREFIX: &str = "rundock.log";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingOptions {
    pub verbose: bool,
    pub format: LogFormat,
    pub dir: Option<PathBuf>,
}

impl LoggingOptions {
    pub fn from_config(config: &RundockConfig) -> Self {
        Self {
            verbose: config.verbose,
            format: config.toml.logging.format,
            dir: config.log_dir(),
        }
    }
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered file output is lost.
pub fn init(options: &LoggingOptions) -> Result<Option<WorkerGuard>> {
    let stderr_layer = match options.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let (file_layer, guard) = match &options.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(options.verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
