//! Embeddable HTTP request router.
//!
//! Routes are registered on a [`RouteTable`] (optionally through prefix
//! [`Group`]s), then the table is frozen and served by [`HttpServer`].

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::NetkitConfig;
pub use http::{handler_fn, BoxHandler, Handler, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{Group, PathParams, RouteError, RouteMethod, RouteTable};
