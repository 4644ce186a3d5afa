//! Logging utilities for the LeadPay services.
//!
//! The binary calls [`init`] once at startup; every crate then logs through the
//! `tracing` macros.

use leadpay_config::LoggingConfig;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix for the rolling log files.
const LOG_FILE_PREFIX: &str = "leadpay.log";

/// Initialize the tracing subscriber from the logging configuration.
///
/// `RUST_LOG` is honoured; on top of it the `leadpay` crates and the HTTP
/// trace layer log at `config.level`. When `config.directory` is set, a second
/// layer writes to a daily rolling file there.
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the program. It is `None` when no file output is configured.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = parse_level(&config.level);

    let mut filter = EnvFilter::from_default_env();
    for target in ["leadpay", "tower_http"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    let (file_layer, guard) = match config.directory.as_deref() {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    // try_init: tests and embedders may already have installed a subscriber
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(file_layer)
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }

    guard
}

/// Parses a level name, defaulting to INFO for anything unrecognised.
pub fn parse_level(level: &str) -> Level {
    level.trim().parse::<Level>().unwrap_or(Level::INFO)
}

/// Log a result, with different messages for success and error cases.
///
/// Returns the original result, so it can be used inline before `?`.
pub fn log_result<T, E: std::fmt::Display>(
    result: Result<T, E>,
    success_message: &str,
    error_context: &str,
) -> Result<T, E> {
    match &result {
        Ok(_) => info!("{}", success_message),
        Err(e) => error!("{}: {}", error_context, e),
    }
    result
}
