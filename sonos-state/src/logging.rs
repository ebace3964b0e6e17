//! Logging infrastructure for Sonos SDK
//!
//! Every crate in the workspace logs through `tracing`; this module installs
//! the subscriber that decides where those records go.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output for development
    Development,
    /// Verbose diagnostics with source locations
    Debug,
    /// One JSON object per line, for log collectors
    Json,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Initialize logging with the specified mode
///
/// Call this once, before the first subscription or poll, so that listener
/// startup is captured too.
///
/// ```rust,ignore
/// sonos_state::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `SONOS_LOG_LEVEL`: Override log level (error, warn, info, debug, trace)
/// - `SONOS_LOG_TARGET`: Only log this target (e.g. `sonos_stream::dispatcher`)
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Json => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(fmt::layer().json().with_current_span(false))
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `SONOS_LOG_MODE`
///
/// Accepts `silent`, `development`, `debug` and `json`; anything else is
/// silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = mode_from_str(std::env::var("SONOS_LOG_MODE").ok().as_deref());
    init_logging(mode)
}

fn mode_from_str(value: Option<&str>) -> LoggingMode {
    match value {
        Some("development") => LoggingMode::Development,
        Some("debug") => LoggingMode::Debug,
        Some("json") => LoggingMode::Json,
        _ => LoggingMode::Silent,
    }
}

fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let level = std::env::var("SONOS_LOG_LEVEL").ok();
    let target = std::env::var("SONOS_LOG_TARGET").ok();
    build_filter(level.as_deref(), target.as_deref(), default_level)
}

/// SONOS_LOG_LEVEL, then RUST_LOG, then the mode default
fn build_filter(
    level: Option<&str>,
    target: Option<&str>,
    default_level: &str,
) -> Result<EnvFilter, LoggingError> {
    let directive = match (target, level) {
        (Some(target), level) => format!("{}={}", target, level.unwrap_or(default_level)),
        (None, Some(level)) => level.to_string(),
        (None, None) => match std::env::var("RUST_LOG") {
            Ok(rust_log) => rust_log,
            Err(_) => default_level.to_string(),
        },
    };

    EnvFilter::try_new(&directive)
        .map_err(|e| LoggingError::InvalidEnv(format!("{}: {}", directive, e)))
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
