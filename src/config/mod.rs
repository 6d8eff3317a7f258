//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! configs/.env (defaults, never overrides the process environment)
//!     → configs/.<APP_ENV>.env or configs/.local.env (overrides)
//!     → loader.rs (EnvConfig: process environment lookups)
//!     → schema.rs (AppSettings: typed view with defaults)
//!     → validation.rs (semantic checks)
//!     → shared via Arc<dyn Config> to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup and never mutated afterwards
//! - Lookups never fail: a missing or unparsable value yields the caller's default
//! - Load errors other than "file not found" are fatal at startup

pub mod loader;
pub mod schema;
pub mod validation;

use std::collections::HashMap;

pub use loader::{ConfigError, EnvConfig, DEFAULT_CONFIG_DIR};
pub use schema::{AppSettings, HttpSettings, LogSettings, ShutdownSettings};

/// Typed key lookups with fallback defaults.
///
/// Implementors only provide [`Config::lookup`]; the typed getters parse the raw
/// value and fall back to the supplied default when the key is absent or the
/// value does not parse.
pub trait Config: Send + Sync {
    /// Raw value for `key`, if set.
    fn lookup(&self, key: &str) -> Option<String>;

    fn get_string(&self, key: &str, default: &str) -> String {
        self.lookup(key).unwrap_or_else(|| default.to_string())
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.lookup(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_float64(&self, key: &str, default: f64) -> f64 {
        self.lookup(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.lookup(key)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(default)
    }
}

/// Parse the boolean spellings accepted in env files.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// In-memory configuration, for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl Config for MapConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
