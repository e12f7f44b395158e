//! Logging setup driven by `[logging]` in the configuration.
//!
//! - `production = false`: pretty stdout with span close events.
//! - `production = true`: JSON lines to a daily file under the log directory,
//!   plus compact stdout for the service manager.

use std::path::Path;
use std::sync::OnceLock;

use gatepass_core::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Overrides `[logging] level` without touching the config file.
pub const LEVEL_ENV: &str = "GATEPASS_LOG_LEVEL";

/// File name prefix for rolled log files.
const LOG_FILE_PREFIX: &str = "gatepass";

// Writer guards; dropping them stops the background writers.
static GUARDS: OnceLock<(WorkerGuard, WorkerGuard)> = OnceLock::new();

/// Install the global subscriber.
///
/// `log_dir` is only used in production mode and is created if missing.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or the log directory
/// cannot be created.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> anyhow::Result<()> {
    let directive = filter_directive(
        &config.level,
        std::env::var(LEVEL_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    let filter = EnvFilter::try_new(&directive)?;

    if config.production {
        init_production(filter, log_dir)?;
    } else {
        init_development(filter);
    }

    tracing::debug!(%directive, production = config.production, "Logging initialized");
    Ok(())
}

/// Pick the filter directive: `RUST_LOG`, then `GATEPASS_LOG_LEVEL`, then
/// the configured level. Blank variables count as unset.
#[must_use]
pub fn filter_directive(
    configured: &str,
    level_env: Option<String>,
    rust_log: Option<String>,
) -> String {
    [rust_log, level_env]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| configured.trim().to_string())
}

fn init_production(filter: EnvFilter, log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(RollingFileAppender::new(
        Rotation::DAILY,
        log_dir,
        LOG_FILE_PREFIX,
    ));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(file_writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(stdout_writer)
                .with_ansi(false),
        )
        .init();

    let _ = GUARDS.set((file_guard, stdout_guard));
    Ok(())
}

fn init_development(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .init();
}
