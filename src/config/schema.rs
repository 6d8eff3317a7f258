//! Typed application settings.
//!
//! Settings are read from a [`Config`] with documented defaults, so an
//! application starts with no env file at all.

use std::time::Duration;

use crate::config::Config;

pub const HTTP_HOST_KEY: &str = "HTTP_HOST";
pub const HTTP_PORT_KEY: &str = "HTTP_PORT";
pub const HTTP_REQUEST_TIMEOUT_KEY: &str = "HTTP_REQUEST_TIMEOUT";
pub const SHUTDOWN_TIMEOUT_KEY: &str = "SHUTDOWN_TIMEOUT";
pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";

pub const DEFAULT_HTTP_HOST: &str = "localhost";
pub const DEFAULT_HTTP_PORT: i64 = 8000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 30;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: i64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Root settings for an application.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub http: HttpSettings,
    pub shutdown: ShutdownSettings,
    pub log: LogSettings,
}

/// HTTP listener settings.
///
/// Numeric fields keep the raw configured value; [`validate_settings`]
/// rejects out-of-range values before they are narrowed.
///
/// [`validate_settings`]: crate::config::validation::validate_settings
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    /// Host or address to bind.
    pub host: String,
    /// TCP port, `0` for an ephemeral port.
    pub port: i64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownSettings {
    /// Deadline given to every server once a termination signal arrives.
    pub timeout_secs: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

impl AppSettings {
    /// Read every setting, falling back to defaults.
    pub fn from_config(config: &dyn Config) -> Self {
        Self {
            http: HttpSettings {
                host: config.get_string(HTTP_HOST_KEY, DEFAULT_HTTP_HOST),
                port: config.get_int(HTTP_PORT_KEY, DEFAULT_HTTP_PORT),
                request_timeout_secs: config
                    .get_int(HTTP_REQUEST_TIMEOUT_KEY, DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            shutdown: ShutdownSettings {
                timeout_secs: config.get_int(SHUTDOWN_TIMEOUT_KEY, DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            log: LogSettings {
                level: config.get_string(LOG_LEVEL_KEY, DEFAULT_LOG_LEVEL),
            },
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_config(&crate::config::MapConfig::new())
    }
}

impl HttpSettings {
    /// Port narrowed to `u16`; out-of-range values fall back to the default.
    pub fn port(&self) -> u16 {
        u16::try_from(self.port).unwrap_or(DEFAULT_HTTP_PORT as u16)
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS)
    }
}

impl ShutdownSettings {
    pub fn timeout(&self) -> Duration {
        secs(self.timeout_secs, DEFAULT_SHUTDOWN_TIMEOUT_SECS)
    }
}

fn secs(value: i64, default: i64) -> Duration {
    let value = u64::try_from(value).unwrap_or(default as u64);
    Duration::from_secs(value)
}
