/*!
 * Logging Module
 * Subscriber setup and request logging middleware
 */
pub mod config;
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use config::{LogLevel, LogSettings};

/// Initialize the logging system.
///
/// The returned guards flush the background writers when dropped; hold them
/// for the life of the process.
pub fn init(settings: &LogSettings) -> Vec<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(&settings.directory) {
        eprintln!("Could not create log directory {}: {}", settings.directory, e);
    }

    // All events
    let (file_writer, file_guard) = non_blocking(rolling::daily(&settings.directory, "app.log"));
    // Errors only
    let (error_writer, error_guard) =
        non_blocking(rolling::daily(&settings.directory, "error.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_directive()));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if settings.json {
        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);

        let error_layer = fmt::layer()
            .json()
            .with_writer(error_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        let _ = subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .try_init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let error_layer = fmt::layer()
            .with_writer(error_writer)
            .with_target(true)
            .with_ansi(false)
            .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        let _ = subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .try_init();
    }

    tracing::info!(
        level = %settings.level,
        json = settings.json,
        "Logging initialized"
    );

    vec![file_guard, error_guard, console_guard]
}
