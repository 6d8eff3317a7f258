//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber once per process
//! - Map the configured level name to a filter
//! - Provide the leveled `Logger` handle shared by every component
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Colourised console output via the fmt layer
//! - `RUST_LOG` wins over the configured level when set

use std::fmt::Display;
use std::sync::Arc;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map a level name to a filter. Unknown names fall back to `INFO`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" | "dpanic" | "panic" | "fatal" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Install the global subscriber and return the root logger.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init(level: &str) -> Logger {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(parse_level(level).into())
            .parse_lossy("")
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(true).with_target(false))
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level = %level, "Logging initialized");
    }

    Logger::new("app")
}

/// Leveled logging handle.
///
/// Cloning is cheap; one logger is built at startup and handed to every
/// server and request [`Context`](crate::http::Context). Formatted messages
/// are passed as `format_args!(..)`.
#[derive(Debug, Clone)]
pub struct Logger {
    scope: Arc<str>,
}

impl Logger {
    pub fn new(scope: impl Into<Arc<str>>) -> Self {
        Self { scope: scope.into() }
    }

    /// Logger for a sub-component, e.g. `app.http`.
    pub fn scoped(&self, name: &str) -> Self {
        Self::new(format!("{}.{}", self.scope, name))
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn debug(&self, message: impl Display) {
        tracing::debug!(scope = %self.scope, "{}", message);
    }

    pub fn info(&self, message: impl Display) {
        tracing::info!(scope = %self.scope, "{}", message);
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!(scope = %self.scope, "{}", message);
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!(scope = %self.scope, "{}", message);
    }

    /// Log at error level and terminate the process with exit code 1.
    pub fn fatal(&self, message: impl Display) -> ! {
        tracing::error!(scope = %self.scope, fatal = true, "{}", message);
        std::process::exit(1)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("app")
    }
}
