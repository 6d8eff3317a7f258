//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, hyper-util connection, graceful drain)
//!     → middleware (request ID, tracing, panic recovery, timeout)
//!     → axum Router (path + method match)
//!     → handler.rs (build Context, call handler, map HandlerError)
//!     → context.rs (request access, JSON/text responses)
//!     → Send to client
//! ```

pub mod context;
pub mod handler;
pub mod request;
pub mod server;

pub use context::Context;
pub use handler::{HandlerError, HandlerResult};
pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;

pub use axum::http::StatusCode;
