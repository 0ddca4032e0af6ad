//! netkit demo server.
//!
//! ```text
//! GET  /home                 GET  /v1/home          GET  /v2/home
//! GET  /home/info            GET  /v1/home/info     GET  /v2/home/info
//! GET  /index → 307 /home
//! GET  /api/users            POST /api/users
//! GET  /api/users/{id}       DELETE /api/users/{id}
//! GET  /routes               GET  /error/{code}
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use netkit::config::{load_config, NetkitConfig};
use netkit::http::{handler_fn, response, HttpServer};
use netkit::lifecycle::{signals, Shutdown};
use netkit::observability::{logging, metrics};
use netkit::routing::{PathParams, RouteError, RouteTable};

#[derive(Parser)]
#[command(name = "netkit")]
#[command(about = "Demo server for the netkit router", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    #[serde(default)]
    id: u64,
    name: String,
}

#[derive(Default)]
struct UserStore {
    next_id: u64,
    users: BTreeMap<u64, User>,
}

type Users = Arc<RwLock<UserStore>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => NetkitConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("netkit v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse::<std::net::SocketAddr>()?;
        metrics::init_metrics(addr)?;
    }

    let table = demo_routes()?;
    let server = HttpServer::new(config, table)?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    signals::forward_signals(shutdown);

    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_routes() -> Result<RouteTable, RouteError> {
    let mut table = RouteTable::new();
    table.get("/home", handler_fn(|_req: Request<Body>| async { home(None) }))?;
    table.get("/home/info", handler_fn(|_req: Request<Body>| async { home_info(None) }))?;
    table.forward("/index", "/home")?;

    for version in [1_u8, 2] {
        let mut group = table.group(&format!("v{version}"));
        group.get(
            "/home",
            handler_fn(move |_req: Request<Body>| async move { home(Some(version)) }),
        )?;
        group.get(
            "/home/info",
            handler_fn(move |_req: Request<Body>| async move { home_info(Some(version)) }),
        )?;
    }

    let users: Users = Arc::default();
    let mut api = table.group("/api");
    let store = users.clone();
    api.get(
        "/users",
        handler_fn(move |_req: Request<Body>| {
            let store = store.clone();
            async move { list_users(store).await }
        }),
    )?;
    let store = users.clone();
    api.post(
        "/users",
        handler_fn(move |req: Request<Body>| {
            let store = store.clone();
            async move { create_user(store, req).await }
        }),
    )?;
    let store = users.clone();
    api.get(
        "/users/{id}",
        handler_fn(move |req: Request<Body>| {
            let store = store.clone();
            async move { get_user(store, req).await }
        }),
    )?;
    let store = users;
    api.delete(
        "/users/{id}",
        handler_fn(move |req: Request<Body>| {
            let store = store.clone();
            async move { delete_user(store, req).await }
        }),
    )?;

    Ok(table)
}

fn home(version: Option<u8>) -> Response {
    let title = match version {
        Some(v) => format!("Home (v{v})"),
        None => "Home".to_string(),
    };
    response::html(StatusCode::OK, format!("<h1>{title}</h1>"))
}

fn home_info(version: Option<u8>) -> Response {
    let body = match version {
        Some(v) => format!("home info, api version {v}"),
        None => "home info".to_string(),
    };
    response::text(StatusCode::OK, body)
}

fn user_id(req: &Request<Body>) -> Option<u64> {
    req.extensions()
        .get::<PathParams>()?
        .get("id")?
        .parse()
        .ok()
}

async fn list_users(store: Users) -> Response {
    let store = store.read().await;
    let users: Vec<&User> = store.users.values().collect();
    response::json(StatusCode::OK, &users)
}

async fn create_user(store: Users, req: Request<Body>) -> Response {
    let mut user: User = match response::read_json(req, 64 * 1024).await {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };
    let mut store = store.write().await;
    store.next_id += 1;
    user.id = store.next_id;
    store.users.insert(user.id, user.clone());
    tracing::info!(user_id = user.id, "User created");
    response::json(StatusCode::CREATED, &user)
}

async fn get_user(store: Users, req: Request<Body>) -> Response {
    let Some(id) = user_id(&req) else {
        return response::bad_request();
    };
    match store.read().await.users.get(&id) {
        Some(user) => response::json(StatusCode::OK, user),
        None => response::not_found(),
    }
}

async fn delete_user(store: Users, req: Request<Body>) -> Response {
    let Some(id) = user_id(&req) else {
        return response::bad_request();
    };
    match store.write().await.users.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => response::not_found(),
    }
}
