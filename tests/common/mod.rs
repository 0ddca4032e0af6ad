//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use netkit::config::NetkitConfig;
use netkit::http::{handler_fn, Handler, HttpServer};
use netkit::lifecycle::Shutdown;
use netkit::routing::{PathParams, RouteTable};

/// A running server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    #[allow(dead_code)]
    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked");
        result.expect("server returned an error");
    }
}

/// Serve `table` with `config` on 127.0.0.1 and an OS-assigned port.
pub async fn spawn_server(config: NetkitConfig, table: RouteTable) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, table).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, rx));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Handler answering `tag`, followed by `:name=value` for each path parameter.
pub fn tagged(tag: &'static str) -> impl Handler {
    handler_fn(move |req: Request<Body>| async move {
        let mut body = tag.to_string();
        if let Some(params) = req.extensions().get::<PathParams>() {
            for (name, value) in params.iter() {
                body.push_str(&format!(":{name}={value}"));
            }
        }
        body
    })
}

/// HTTP client that never reuses pooled connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
