//! Configuration presets for common setups

use super::{LoggerConfig, StreamHandlerConfig};
use crate::handler::{STDERR_URI, STDOUT_URI};
use crate::level::Level;

/// Channel name
pub const ENV_CHANNEL: &str = "BEACON_LOG_CHANNEL";

/// Single destination for every level; unset means stderr/stdout split
pub const ENV_STREAM: &str = "BEACON_LOG_STREAM";

/// Memory limit used to size write buffers
pub const ENV_MEMORY_LIMIT: &str = "BEACON_MEMORY_LIMIT";

/// `0`, `false`, `off` or `no` silences context diagnostics
pub const ENV_WARN_CONTEXT: &str = "BEACON_LOG_WARN_CONTEXT";

impl LoggerConfig {
    /// Levels 0-3 to stderr, 4-7 to stdout
    #[must_use]
    pub fn split_std() -> Self {
        Self {
            handlers: vec![
                StreamHandlerConfig::new(STDERR_URI).with_levels(&Level::ALL[..4]),
                StreamHandlerConfig::new(STDOUT_URI).with_levels(&Level::ALL[4..]),
            ],
            ..Self::default()
        }
    }

    /// Every level to `stream`
    #[must_use]
    pub fn single(stream: impl Into<String>) -> Self {
        Self {
            handlers: vec![StreamHandlerConfig::new(stream)],
            ..Self::default()
        }
    }

    /// Create configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match lookup(ENV_STREAM).filter(|s| !s.is_empty()) {
            Some(stream) => Self::single(stream),
            None => Self::split_std(),
        };

        config.channel = lookup(ENV_CHANNEL).filter(|c| !c.is_empty());
        config.memory_limit = lookup(ENV_MEMORY_LIMIT);

        if let Some(warn) = lookup(ENV_WARN_CONTEXT) {
            config.warn_on_invalid_context = !matches!(
                warn.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }

        config
    }
}
