//! Process lifecycle: signals and graceful shutdown.
//!
//! # Data Flow
//! ```text
//! SIGTERM/SIGINT (signals.rs)
//!     → Shutdown::trigger (shutdown.rs broadcast)
//!     → HttpServer::run stops accepting, drains open connections
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - In-flight requests finish on the table snapshot they started with

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
