//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT/SIGTERM handlers
//! - Resolve once the process is asked to stop
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered when `install` is called, not on first poll, so
//!   a signal sent right after startup is not lost
//! - Non-unix platforms only get Ctrl+C

use std::io;

/// Termination signal listener.
#[cfg(unix)]
pub struct TerminationSignal {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignal {
    /// Register the handlers. Must be called within a Tokio runtime.
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next termination signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

/// Termination signal listener.
#[cfg(not(unix))]
pub struct TerminationSignal {
    _private: (),
}

#[cfg(not(unix))]
impl TerminationSignal {
    pub fn install() -> io::Result<Self> {
        Ok(Self { _private: () })
    }

    pub async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending().await
            }
        }
    }
}
