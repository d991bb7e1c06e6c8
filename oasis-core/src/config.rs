//! Server Configuration
//!
//! Settings come from compiled-in defaults, optionally overridden by
//! environment variables:
//!
//! | Variable               | Default          |
//! |------------------------|------------------|
//! | `OASIS_ADDR`           | `127.0.0.1:3000` |
//! | `OASIS_MAX_BODY_BYTES` | `2097152`        |

use std::net::SocketAddr;

use crate::error::ConfigError;

/// Largest request body an island handler buffers by default.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Environment variable overriding [`ServerConfig::addr`].
pub const ADDR_VAR: &str = "OASIS_ADDR";

/// Environment variable overriding [`ServerConfig::max_body_bytes`].
pub const BODY_LIMIT_VAR: &str = "OASIS_MAX_BODY_BYTES";

/// Where and how to serve islands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address.
    pub addr: SocketAddr,
    /// Request body limit in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_body_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ADDR_VAR) {
            config.addr = value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidAddr {
                    value: value.clone(),
                    source,
                })?;
        }

        if let Some(value) = lookup(BODY_LIMIT_VAR) {
            config.max_body_bytes =
                value
                    .trim()
                    .parse()
                    .map_err(|source| ConfigError::InvalidLimit {
                        value: value.clone(),
                        source,
                    })?;
        }

        Ok(config)
    }
}
