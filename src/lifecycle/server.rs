//! The lifecycle contract shared by every network-facing component.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::lifecycle::shutdown::ShutdownError;

/// A long-running listener managed by the [`App`](crate::App).
///
/// The app holds servers as `Arc<dyn Server>` and only ever calls these
/// methods; each implementation owns its transport exclusively.
///
/// Contract:
/// - `run` serves until `shutdown` closes the transport, or returns early on a
///   bind failure. Failures are logged, never returned.
/// - A second `run` while the first is active logs a warning and returns.
/// - `shutdown` before `run` is a no-op returning `Ok(())`, and repeated calls
///   after the first return immediately.
#[async_trait]
pub trait Server: Send + Sync {
    /// Label used in logs and shutdown errors.
    fn name(&self) -> &str;

    async fn run(&self);

    /// Drain in-flight work by `deadline`, forcing the transport closed otherwise.
    async fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownError>;
}
