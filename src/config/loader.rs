//! Configuration loading from env files.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Config;

/// Directory searched for env files when it exists.
pub const DEFAULT_CONFIG_DIR: &str = "./configs";
/// Base env file, loaded without overriding the process environment.
pub const DEFAULT_CONFIG_NAME: &str = ".env";
/// Override file used when `APP_ENV` is unset.
pub const DEFAULT_OVERRIDE_NAME: &str = ".local.env";
/// Selects the `.<APP_ENV>.env` override file.
pub const APP_ENV_KEY: &str = "APP_ENV";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config from file {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("invalid configuration: {}", .0.join(", "))]
    Invalid(Vec<String>),
}

/// Configuration backed by the process environment.
///
/// Env files are merged into the environment once by [`EnvConfig::load`];
/// afterwards every lookup reads the environment directly.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    loaded: Vec<PathBuf>,
    missing: Vec<PathBuf>,
}

impl EnvConfig {
    /// Configuration that reads the environment without loading any file.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Load `<dir>/.env`, then the override file selected by `APP_ENV`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let app_env = std::env::var(APP_ENV_KEY).ok().filter(|v| !v.is_empty());
        Self::load_with_env(dir, app_env.as_deref())
    }

    /// Same as [`EnvConfig::load`] with an explicit `APP_ENV` value.
    pub fn load_with_env(dir: impl AsRef<Path>, app_env: Option<&str>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let mut config = Self::default();

        let base = dir.join(DEFAULT_CONFIG_NAME);
        match dotenvy::from_path(&base) {
            Ok(()) => config.loaded.push(base),
            Err(e) if e.not_found() => config.missing.push(base),
            Err(source) => return Err(ConfigError::Load { path: base, source }),
        }

        let override_file = match app_env {
            Some(env) => dir.join(format!(".{env}.env")),
            None => dir.join(DEFAULT_OVERRIDE_NAME),
        };
        match dotenvy::from_path_override(&override_file) {
            Ok(()) => config.loaded.push(override_file),
            Err(e) if e.not_found() => {}
            Err(source) => {
                return Err(ConfigError::Load {
                    path: override_file,
                    source,
                })
            }
        }

        Ok(config)
    }

    /// Env files that were read, in load order.
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded
    }

    /// Base env files that did not exist.
    pub fn missing_files(&self) -> &[PathBuf] {
        &self.missing
    }
}

impl Config for EnvConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Pick the config directory: `./configs` when present, else the working directory.
pub fn default_config_dir() -> PathBuf {
    let dir = Path::new(DEFAULT_CONFIG_DIR);
    if dir.is_dir() {
        dir.to_path_buf()
    } else {
        PathBuf::from(".")
    }
}
