//! Logging initialization.

use tracing::Level;
use tracing_subscriber::{
    fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_LOG_TARGET: &str = "olm_gateway";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub json_format: bool,
    pub colorize: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            colorize: true,
        }
    }
}

const fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise only this crate's events are emitted
/// at the configured level. Safe to call more than once (later calls are
/// no-ops), which keeps test setups simple.
pub fn init_logging(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={}",
            DEFAULT_LOG_TARGET,
            level_to_str(config.level)
        ))
    });

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_ansi(config.colorize)
        .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()));

    if config.json_format {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer.json().flatten_event(true))
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_to_str() {
        assert_eq!(level_to_str(Level::INFO), "info");
        assert_eq!(level_to_str(Level::WARN), "warn");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig {
            level: Level::DEBUG,
            json_format: true,
            colorize: false,
        });
    }
}
