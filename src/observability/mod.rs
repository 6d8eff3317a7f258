//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (leveled log events through one shared Logger)
//!     → tower-http TraceLayer (per-request spans carrying x-request-id)
//!
//! Consumers:
//!     → stdout (colourised console)
//! ```

pub mod logging;

pub use logging::Logger;
