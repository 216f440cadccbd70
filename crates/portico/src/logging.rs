//! Explicit logging bootstrap for binaries.
//!
//! The library crates only emit `tracing` events and never install a
//! subscriber themselves. Binaries opt in through [`init`]; tests scope
//! their own subscribers with `tracing::subscriber::with_default`.
//!
//! # Example
//!
//! ```rust,ignore
//! use portico::logging::{init, LogConfig};
//!
//! init(&LogConfig::default())?;
//! tracing::info!(addr = "0.0.0.0:8080", "starting");
//! ```

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`,
    /// `portico=debug`).
    pub level: String,

    /// Whether to emit JSON lines instead of human-readable output.
    pub json: bool,

    /// Whether to include the event target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            // JSON by default for production.
            json: true,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json: false,
            include_target: true,
        }
    }
}

/// Errors from initializing the logging bootstrap.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The level string is not a valid filter directive.
    #[error("invalid log filter directive")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG` overrides the configured level when set.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] for an unparsable directive and
/// [`LoggingError::AlreadyInitialized`] when a subscriber already exists.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) => EnvFilter::try_new(env)?,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    if config.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(config.include_target);
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;
    } else {
        let layer = tracing_subscriber::fmt::layer().with_target(config.include_target);
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;
    }

    Ok(())
}
