//! Structured logging for the style agent.
//!
//! Provides configurable logging with support for:
//! - JSON and human-readable formats
//! - Multiple output targets (stdout, file)
//! - Log rotation
//! - `RUST_LOG` overriding the configured level

mod config;

pub use config::{LogConfig, LogFormat, LogOutput, RotationConfig};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// File name used for the rolling log file.
const LOG_FILE_NAME: &str = "electrotheme.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the logging system with the given configuration.
///
/// Returns guards that must be kept alive for the duration of the program
/// so buffered file output is flushed.
///
/// # Example
///
/// ```no_run
/// use electrotheme_telemetry::logging::{LogConfig, init_logging};
///
/// let _guards = init_logging(&LogConfig::default()).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let env_filter = build_filter(config)?;

    let mut guards = Vec::new();
    let mut layers: Vec<BoxedLayer> = Vec::new();

    for output in &config.outputs {
        match output {
            LogOutput::Stdout => {
                layers.push(fmt_layer(config, std::io::stdout, true));
            }
            LogOutput::File { path, rotation } => {
                let (layer, guard) = file_layer(config, path, rotation.as_ref())?;
                layers.push(layer);
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

/// Builds the level filter, preferring `RUST_LOG` when it is set.
fn build_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| LoggingError::InvalidConfig(format!("level '{}': {e}", config.level)))
}

fn fmt_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(if config.include_span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        });

    match config.format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Pretty => layer.boxed(),
    }
}

fn file_layer(
    config: &LogConfig,
    path: &str,
    rotation: Option<&RotationConfig>,
) -> Result<(BoxedLayer, WorkerGuard), LoggingError> {
    let dir = Path::new(path);
    std::fs::create_dir_all(dir)?;

    let file_appender = match rotation.copied().unwrap_or(RotationConfig::Daily) {
        RotationConfig::Hourly => tracing_appender::rolling::hourly(dir, LOG_FILE_NAME),
        RotationConfig::Daily => tracing_appender::rolling::daily(dir, LOG_FILE_NAME),
        RotationConfig::Never => tracing_appender::rolling::never(dir, LOG_FILE_NAME),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    Ok((fmt_layer(config, non_blocking, false), guard))
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
