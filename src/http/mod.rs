//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum transport, request ID, timeout, trace layers)
//!     → middleware.rs (request metrics, access log, panic recovery)
//!     → server.rs Dispatcher (`*` target, clean-path redirect, snapshot load)
//!     → routing::RouteTable::dispatch (resolve, attach params)
//!     → handler.rs (application handler or pages.rs built-in)
//!     → response.rs helpers
//!     → Send to client
//! ```

pub mod handler;
pub mod middleware;
pub mod pages;
pub mod response;
pub mod server;

pub use handler::{boxed, handler_fn, BoxHandler, Handler, HandlerFn};
pub use server::HttpServer;
