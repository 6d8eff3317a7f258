//! Application bootstrap scaffold.
//!
//! Wires env-file configuration, a shared leveled logger and any number of
//! servers into one [`App`] with coordinated startup and graceful shutdown.

pub mod app;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use app::App;
pub use config::Config;
pub use http::{Context, HandlerError, HandlerResult, HttpServer};
pub use lifecycle::{Phase, Server, ShutdownError, ShutdownErrors};
pub use observability::Logger;
