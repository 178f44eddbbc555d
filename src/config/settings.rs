//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every field has a default, so an empty object (or no file at all) is a
//! valid configuration.

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default recommendation backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Routes served next to the MCP endpoint.
const RESERVED_PATHS: [&str; 2] = ["/health", "/mcp.json"];

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Recommendation backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "server.port must be non-zero".to_string(),
            });
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid MCP path '{}'. Must start with '/'",
                    self.server.path
                ),
            });
        }

        if let Some(segment) = invalid_path_segment(&self.server.path) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid MCP path '{}': segment '{segment}' must be non-empty \
                     literal text without '{{', '}}', ':' or '*'",
                    self.server.path
                ),
            });
        }

        if RESERVED_PATHS.contains(&self.server.path.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "MCP path '{}' collides with a built-in route",
                    self.server.path
                ),
            });
        }

        if self.server.keep_alive_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "server.keep_alive_secs must be greater than zero".to_string(),
            });
        }

        let url = Url::parse(&self.backend.base_url).map_err(|e| ConfigError::ValidationError {
            message: format!("Invalid backend URL '{}': {e}", self.backend.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid backend URL scheme '{}'. Must be http or https",
                    url.scheme()
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }

        Ok(())
    }
}

/// Returns the first segment of `path` that cannot be routed as literal text.
///
/// `/` alone is the root route; otherwise every segment must be non-empty
/// and free of route-pattern syntax.
fn invalid_path_segment(path: &str) -> Option<&str> {
    let rest = path.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }
    rest.split('/').find(|segment| {
        segment.is_empty() || segment.starts_with([':', '*']) || segment.contains(['{', '}'])
    })
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to bind.
    /// Default: "0.0.0.0"
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route path of the MCP endpoint.
    #[serde(default = "default_path")]
    pub path: String,

    /// Seconds between keep-alive comments on standing SSE streams.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_path() -> String {
    "/mcp".to_string()
}

const fn default_keep_alive_secs() -> u64 {
    30
}

/// Recommendation backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL; `/recommend` is appended.
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Request timeout in seconds. Unset means the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_secs: None,
        }
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
