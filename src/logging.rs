//! Structured logging setup.
//!
//! Thin wrapper over `tracing-subscriber`. Log output goes to stderr so the
//! transfer summary on stdout stays machine-readable.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
        }
    }
}

/// The `SKIFF_LOG` environment variable wins over the configured level.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env("SKIFF_LOG") {
        return Ok(filter);
    }
    config
        .level
        .parse()
        .map_err(|e| SyncError::Config(format!("invalid log level {:?}: {e}", config.level)))
}

/// Initialize the global subscriber. Safe to call once per process.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config)?;
    let base = Registry::default().with(filter);

    match config.format.as_str() {
        "json" => {
            base.with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
        }
        "text" => {
            base.with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
        }
        other => {
            return Err(SyncError::Config(format!(
                "unknown log format {other:?} (expected \"text\" or \"json\")"
            )))
        }
    }
    .map_err(|e| SyncError::Config(format!("failed to initialize logging: {e}")))
}
