//! Handler wrappers.
//!
//! Middleware here is plain function composition: each function takes a
//! handler and returns a handler of the same shape.
//!
//! ```text
//! with_metrics(with_logging(with_recovery(handler)))
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use futures_util::FutureExt;

use crate::http::handler::{boxed, handler_fn, BoxHandler, Handler};
use crate::http::response;
use crate::observability::metrics;

/// Log one line per request.
pub fn with_logging(next: BoxHandler) -> BoxHandler {
    boxed(handler_fn(move |req: Request<Body>| {
        let next = next.clone();
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_owned();

        async move {
            let response = next.call(req).await;
            let status = response.status();
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            if status.is_client_error() || status.is_server_error() {
                tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    elapsed_ms,
                    "Request failed"
                );
            } else {
                tracing::info!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    elapsed_ms,
                    "Request served"
                );
            }
            response
        }
    }))
}

/// Record request count and latency, independently of the access log.
pub fn with_metrics(next: BoxHandler) -> BoxHandler {
    boxed(handler_fn(move |req: Request<Body>| {
        let next = next.clone();
        let started = Instant::now();
        let method = req.method().clone();

        async move {
            let response = next.call(req).await;
            metrics::record_request(method.as_str(), response.status().as_u16(), started);
            response
        }
    }))
}

/// Turn a panicking handler into a 500 response.
pub fn with_recovery(next: BoxHandler) -> BoxHandler {
    boxed(handler_fn(move |req: Request<Body>| {
        let next = next.clone();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        async move {
            let handled = AssertUnwindSafe(async move { next.call(req).await });
            match handled.catch_unwind().await {
                Ok(response) => response,
                Err(panic) => {
                    tracing::error!(
                        method = %method,
                        path = %path,
                        panic = %panic_message(panic.as_ref()),
                        "Handler panicked"
                    );
                    response::status_error(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
    }))
}

/// Only let `method` through; anything else gets a 405.
pub fn only(method: Method, next: BoxHandler) -> BoxHandler {
    boxed(handler_fn(move |req: Request<Body>| {
        let allowed = req.method() == method;
        let fut = allowed.then(|| next.call(req));
        let method = method.clone();
        async move {
            match fut {
                Some(fut) => fut.await,
                None => response::method_not_allowed(&[method]),
            }
        }
    }))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;

    fn request(method: Method) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/jobs")
            .body(Body::empty())
            .unwrap()
    }

    fn ok_handler() -> BoxHandler {
        boxed(handler_fn(|_req: Request<Body>| async { "done" }))
    }

    fn panicking_handler() -> BoxHandler {
        boxed(handler_fn(|_req: Request<Body>| async {
            if true {
                panic!("boom");
            }
            "unreachable"
        }))
    }

    async fn call(handler: &BoxHandler, method: Method) -> Response {
        handler.call(request(method)).await
    }

    #[tokio::test]
    async fn test_recovery_catches_panics() {
        let handler = with_recovery(panicking_handler());
        let response = call(&handler, Method::GET).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let handler = with_recovery(ok_handler());
        assert_eq!(call(&handler, Method::GET).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_only_guards_method() {
        let handler = only(Method::POST, ok_handler());
        assert_eq!(call(&handler, Method::POST).await.status(), StatusCode::OK);

        let response = call(&handler, Method::GET).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "POST");
    }

    #[tokio::test]
    async fn test_logging_is_transparent() {
        let handler = with_logging(with_recovery(ok_handler()));
        let response = call(&handler, Method::GET).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"done");
    }

    #[tokio::test]
    async fn test_metrics_recorded_without_logging() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        let handler = with_metrics(with_recovery(panicking_handler()));
        assert_eq!(
            call(&handler, Method::DELETE).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let rendered = handle.render();
        let line = rendered
            .lines()
            .find(|l| l.starts_with("netkit_requests_total{"))
            .unwrap();
        assert!(line.contains(r#"method="DELETE""#));
        assert!(line.contains(r#"status="500""#));
        assert!(line.ends_with(" 1"));
        assert!(rendered.contains("netkit_request_duration_seconds"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(3_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
