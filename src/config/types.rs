//! Gateway configuration.

use crate::config::{ConfigError, ConfigResult};
use crate::reasoning_parser::TagDelimiters;

/// Process-wide gateway configuration, validated eagerly at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address for the HTTP server.
    pub host: String,
    /// Bind port for the HTTP server.
    pub port: u16,
    /// Base URL of the upstream Ollama runtime.
    pub ollama_url: String,
    /// Maximum concurrent generation calls to the upstream engine.
    pub max_concurrent_generations: usize,
    /// Connect/read timeout for upstream calls, in seconds.
    pub request_timeout_secs: u64,
    /// Opening marker of a thinking region.
    pub think_open_tag: String,
    /// Closing marker of a thinking region.
    pub think_close_tag: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let delimiters = TagDelimiters::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            ollama_url: "http://localhost:11434".to_string(),
            max_concurrent_generations: 2,
            request_timeout_secs: 300,
            think_open_tag: delimiters.open,
            think_close_tag: delimiters.close,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent_generations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_generations".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.think_open_tag.is_empty() || self.think_close_tag.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "thinking delimiters must be non-empty".to_string(),
            });
        }
        if self.think_open_tag == self.think_close_tag {
            return Err(ConfigError::ValidationFailed {
                reason: "thinking delimiters must be distinct".to_string(),
            });
        }
        if self.ollama_url.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "ollama_url must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn delimiters(&self) -> TagDelimiters {
        TagDelimiters::new(self.think_open_tag.clone(), self.think_close_tag.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = GatewayConfig {
            max_concurrent_generations: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "max_concurrent_generations"
        ));
    }

    #[test]
    fn test_identical_delimiters_rejected() {
        let config = GatewayConfig {
            think_open_tag: "<x>".to_string(),
            think_close_tag: "<x>".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        let config = GatewayConfig {
            think_open_tag: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
