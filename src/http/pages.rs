//! Built-in pages registered next to the application's routes.
//!
//! # Responsibilities
//! - JSON listing of every registered route (`[router].routes_page`)
//! - `GET /error/{code}` rendering the JSON error body for a status code
//!
//! # Design Decisions
//! - Pages are ordinary table entries, so they show up in the listing and
//!   collide with application routes like any other registration
//! - The listing reads the snapshot the server attached to the request, so
//!   it always describes the table actually serving it

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde::Serialize;

use crate::config::RouterConfig;
use crate::http::handler::handler_fn;
use crate::http::response;
use crate::routing::pattern::PathParams;
use crate::routing::table::{RouteError, RouteInfo, RouteTable};

/// Pattern of the error page route.
pub const ERROR_PAGE_PATTERN: &str = "/error/{code}";

/// Body of the route listing page.
#[derive(Debug, Serialize)]
pub struct RouteListing {
    pub count: usize,
    pub routes: Vec<RouteInfo>,
}

/// Register the pages enabled in `config` on `table`.
pub fn register_builtin_routes(config: &RouterConfig, table: &mut RouteTable) -> Result<(), RouteError> {
    if let Some(page) = &config.routes_page {
        table.get(page, handler_fn(|req: Request<Body>| async move { routes_page(req) }))?;
        tracing::debug!(pattern = %page, "Route listing page registered");
    }
    if config.error_pages {
        table.get(
            ERROR_PAGE_PATTERN,
            handler_fn(|req: Request<Body>| async move { error_page(req) }),
        )?;
        tracing::debug!(pattern = ERROR_PAGE_PATTERN, "Error pages registered");
    }
    Ok(())
}

fn routes_page(req: Request<Body>) -> Response {
    match req.extensions().get::<Arc<RouteTable>>() {
        Some(table) => {
            let routes = table.describe();
            response::json(
                StatusCode::OK,
                &RouteListing {
                    count: routes.len(),
                    routes,
                },
            )
        }
        None => {
            tracing::error!("Route listing requested outside the server dispatcher");
            response::status_error(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn error_page(req: Request<Body>) -> Response {
    let code = req
        .extensions()
        .get::<PathParams>()
        .and_then(|params| params.get("code"))
        .unwrap_or_default();

    match error_status(code) {
        Some(status) => response::status_error(status),
        None => response::error_json(
            StatusCode::BAD_REQUEST,
            format!("{code:?} is not an error status code"),
        ),
    }
}

/// A 4xx or 5xx status parsed from `code`.
fn error_status(code: &str) -> Option<StatusCode> {
    let status = code.parse::<u16>().ok().and_then(|n| StatusCode::from_u16(n).ok())?;
    (status.is_client_error() || status.is_server_error()).then_some(status)
}
