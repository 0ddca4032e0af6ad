//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router whose fallback feeds every request to the route table
//! - Wire up middleware (tracing, timeout, request ID)
//! - Reject `*` request targets and redirect unclean paths
//! - Bind server to listener and stop on the shutdown broadcast
//!
//! # Design Decisions
//! - Axum only provides the transport; all routing happens in [`RouteTable`]
//! - Each request loads one table snapshot and keeps it until it completes

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::Response,
    Router,
};
use futures_util::future::BoxFuture;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::NetkitConfig;
use crate::http::handler::{boxed, BoxHandler, Handler};
use crate::http::middleware::{with_logging, with_metrics, with_recovery};
use crate::http::pages::register_builtin_routes;
use crate::http::response;
use crate::routing::path::clean_path;
use crate::routing::snapshot::SharedRoutes;
use crate::routing::table::{RouteError, RouteTable};

/// Application state injected into the fallback handler.
#[derive(Clone)]
pub struct AppState {
    pub entry: BoxHandler,
    pub routes: Arc<SharedRoutes>,
}

/// HTTP server serving a [`RouteTable`].
pub struct HttpServer {
    router: Router,
    routes: Arc<SharedRoutes>,
    config: NetkitConfig,
}

impl HttpServer {
    /// Register the built-in pages on `table`, freeze it and build the router.
    pub fn new(config: NetkitConfig, mut table: RouteTable) -> Result<Self, RouteError> {
        register_builtin_routes(&config.router, &mut table)?;
        tracing::info!(routes = table.len(), "Route table frozen");

        let routes = Arc::new(SharedRoutes::new(table));
        let dispatcher = boxed(Dispatcher {
            routes: routes.clone(),
            redirect_clean_paths: config.router.redirect_clean_paths,
        });
        let recovered = with_recovery(dispatcher);
        let entry = with_metrics(if config.router.access_log {
            with_logging(recovered)
        } else {
            recovered
        });

        let state = AppState {
            entry,
            routes: routes.clone(),
        };
        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            routes,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &NetkitConfig, state: AppState) -> Router {
        Router::new()
            .fallback(serve)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The live route table holder.
    pub fn routes(&self) -> &Arc<SharedRoutes> {
        &self.routes
    }

    /// Swap in a new table, with the built-in pages registered on it.
    pub fn replace_routes(&self, mut table: RouteTable) -> Result<Arc<RouteTable>, RouteError> {
        register_builtin_routes(&self.config.router, &mut table)?;
        Ok(self.routes.replace(table))
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &NetkitConfig {
        &self.config
    }

    /// The fully layered router, for serving in-process.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.load().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown requested, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn serve(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.entry.call(request).await
}

/// Resolves requests against the current route table snapshot.
struct Dispatcher {
    routes: Arc<SharedRoutes>,
    redirect_clean_paths: bool,
}

impl Handler for Dispatcher {
    fn call(&self, mut req: Request<Body>) -> BoxFuture<'static, Response> {
        let path = req.uri().path();
        if path == "*" {
            return Box::pin(async { asterisk_target() });
        }

        if self.redirect_clean_paths {
            let cleaned = clean_path(path);
            if cleaned != path {
                let location = match req.uri().query() {
                    Some(query) => format!("{cleaned}?{query}"),
                    None => cleaned,
                };
                tracing::debug!(path = %path, location = %location, "Redirecting to clean path");
                return Box::pin(async move {
                    response::redirect(StatusCode::MOVED_PERMANENTLY, &location)
                });
            }
        }

        let table = self.routes.load();
        req.extensions_mut().insert(table.clone());
        Box::pin(async move { table.dispatch(req).await })
    }
}

fn asterisk_target() -> Response {
    let mut response = response::bad_request();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler_fn;
    use crate::routing::pattern::PathParams;
    use axum::http::Method;
    use tower::ServiceExt;

    fn demo_table() -> RouteTable {
        let mut table = RouteTable::new();
        table
            .get("/home", handler_fn(|_req: Request<Body>| async { "home" }))
            .unwrap();
        table
            .get(
                "/users/{id}",
                handler_fn(|req: Request<Body>| async move {
                    let params = req.extensions().get::<PathParams>().cloned().unwrap_or_default();
                    format!("user {}", params.get("id").unwrap_or("?"))
                }),
            )
            .unwrap();
        table
            .get(
                "/panic",
                handler_fn(|_req: Request<Body>| async {
                    if true {
                        panic!("handler bug");
                    }
                    "unreachable"
                }),
            )
            .unwrap();
        table
    }

    fn server() -> HttpServer {
        HttpServer::new(NetkitConfig::default(), demo_table()).unwrap()
    }

    async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, Response) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        (response.status(), response)
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_routes_requests_through_table() {
        let router = server().into_router();
        let (status, response) = send(router.clone(), Method::GET, "/home").await;
        assert_eq!(status, StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(text(response).await, "home");

        let (status, response) = send(router, Method::GET, "/users/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text(response).await, "user 42");
    }

    #[tokio::test]
    async fn test_misses() {
        let router = server().into_router();
        let (status, _) = send(router.clone(), Method::GET, "/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, response) = send(router, Method::POST, "/home").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET");
    }

    #[tokio::test]
    async fn test_asterisk_target() {
        let router = server().into_router();
        let (status, response) = send(router, Method::OPTIONS, "*").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONNECTION], "close");
    }

    #[tokio::test]
    async fn test_unclean_path_redirect() {
        let router = server().into_router();
        let (status, response) = send(router, Method::GET, "/users//7/../8?x=1").await;
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/users/8?x=1");
    }

    #[tokio::test]
    async fn test_redirect_can_be_disabled() {
        let mut config = NetkitConfig::default();
        config.router.redirect_clean_paths = false;
        let router = HttpServer::new(config, demo_table()).unwrap().into_router();
        let (status, _) = send(router, Method::GET, "/./home").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let router = server().into_router();
        let (status, _) = send(router, Method::GET, "/panic").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_replace_routes_keeps_builtin_pages() {
        let server = server();
        let mut table = RouteTable::new();
        table
            .get("/fresh", handler_fn(|_req: Request<Body>| async { "fresh" }))
            .unwrap();
        let previous = server.replace_routes(table).unwrap();
        assert!(previous.len() > 1);

        let router = server.into_router();
        let (status, _) = send(router.clone(), Method::GET, "/fresh").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(router.clone(), Method::GET, "/home").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, response) = send(router, Method::GET, "/routes").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text(response).await.contains("/fresh"));
    }

    #[tokio::test]
    async fn test_request_metrics_without_access_log() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let mut config = NetkitConfig::default();
        config.router.access_log = false;
        let router = HttpServer::new(config, demo_table()).unwrap().into_router();
        let (status, _) = send(router, Method::GET, "/home").await;
        assert_eq!(status, StatusCode::OK);

        let rendered = handle.render();
        assert!(rendered
            .lines()
            .any(|l| l.starts_with("netkit_requests_total{") && l.contains(r#"status="200""#)));
        assert!(rendered.contains(r#"netkit_resolutions_total{outcome="matched"} 1"#));
    }

    #[test]
    fn test_builtin_collision_is_an_error() {
        let mut table = demo_table();
        table
            .get("/routes", handler_fn(|_req: Request<Body>| async { "taken" }))
            .unwrap();
        assert!(HttpServer::new(NetkitConfig::default(), table).is_err());
    }
}
