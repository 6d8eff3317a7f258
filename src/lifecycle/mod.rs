//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load env files → Init logging → Validate settings → Register servers
//!
//! Run (app.rs):
//!     Install signals (signals.rs) → Spawn one task per Server (server.rs)
//!     → Wait for every task
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → fresh deadline → every Server::shutdown concurrently
//!     → graceful drain or forced close → aggregate errors
//! ```
//!
//! # Design Decisions
//! - The shutdown deadline is computed after the signal, never derived from it
//! - A failing server never stops its siblings from shutting down
//! - A server whose `run` returns early leaves its siblings running

pub mod phase;
pub mod server;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use phase::Phase;
pub use server::Server;
pub use shutdown::{ServerFailure, ShutdownError, ShutdownErrors};
pub use signals::TerminationSignal;
