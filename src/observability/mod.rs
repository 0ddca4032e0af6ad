//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing::table (resolution outcome)
//!     → metrics.rs record_resolution
//! http::middleware::with_logging (one line per request)
//!     → tracing events → logging.rs subscriber (pretty | json)
//! http::middleware::with_metrics (every request)
//!     → metrics.rs record_request → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Access log lines carry the `x-request-id` set by the server layers
//! - Nothing here is required: without `init_*` calls events and metrics
//!   are simply dropped

pub mod logging;
pub mod metrics;
