//! Startup orchestration.
//!
//! # Responsibilities
//! - Load env files and build the process-wide config
//! - Initialize logging once, at the configured level
//! - Read and validate typed settings
//!
//! # Design Decisions
//! - Fail fast: any config error aborts startup before a server exists
//! - Env files are loaded before logging so `LOG_LEVEL` may come from a file;
//!   load results are logged right after the subscriber is installed

use std::path::Path;
use std::sync::Arc;

use crate::config::loader::{default_config_dir, ConfigError, EnvConfig};
use crate::config::schema::{AppSettings, DEFAULT_LOG_LEVEL, LOG_LEVEL_KEY};
use crate::config::validation::validate_settings;
use crate::config::Config;
use crate::observability::logging::{self, Logger};

/// Everything an [`App`](crate::App) needs before servers are registered.
pub struct Bootstrap {
    pub config: Arc<dyn Config>,
    pub settings: AppSettings,
    pub logger: Logger,
}

/// Load config from the default directory and initialize logging.
pub fn bootstrap() -> Result<Bootstrap, ConfigError> {
    bootstrap_from(default_config_dir())
}

/// Load config from `dir` and initialize logging.
pub fn bootstrap_from(dir: impl AsRef<Path>) -> Result<Bootstrap, ConfigError> {
    let loaded = EnvConfig::load(dir.as_ref());

    let level = EnvConfig::from_env().get_string(LOG_LEVEL_KEY, DEFAULT_LOG_LEVEL);
    let logger = logging::init(&level);

    let config = loaded?;
    for path in config.missing_files() {
        tracing::warn!(path = %path.display(), "Config file not found");
    }
    for path in config.loaded_files() {
        tracing::info!(path = %path.display(), "Loaded config from file");
    }

    from_config(Arc::new(config), logger)
}

/// Build settings from an already loaded config.
pub fn from_config(config: Arc<dyn Config>, logger: Logger) -> Result<Bootstrap, ConfigError> {
    let settings = AppSettings::from_config(config.as_ref());
    validate_settings(&settings).map_err(ConfigError::Invalid)?;

    tracing::debug!(
        http_host = %settings.http.host,
        http_port = settings.http.port,
        shutdown_timeout_secs = settings.shutdown.timeout_secs,
        "Configuration loaded"
    );

    Ok(Bootstrap {
        config,
        settings,
        logger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;

    #[test]
    fn test_invalid_settings_abort_startup() {
        let config = MapConfig::new().with("HTTP_PORT", "-1");
        let err = from_config(Arc::new(config), Logger::default()).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid(ref errors) if errors.len() == 1));
    }

    #[test]
    fn test_bootstrap_loads_env_file() {
        let id = uuid::Uuid::new_v4();
        let dir = std::env::temp_dir().join(format!("ipa-boot-{id}"));
        std::fs::create_dir_all(&dir).unwrap();
        let key = format!("IPA_BOOT_{}", id.simple());
        std::fs::write(dir.join(".env"), format!("{key}=from-file\n")).unwrap();

        let boot = bootstrap_from(&dir).unwrap();

        assert_eq!(boot.config.get_string(&key, "fallback"), "from-file");
        assert_eq!(boot.config.get_string("IPA_TEST_UNSET_KEY", "fallback"), "fallback");
        assert!(validate_settings(&boot.settings).is_ok());
    }
}
