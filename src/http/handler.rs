//! Handler abstraction shared by the route table, groups and middleware.
//!
//! A handler takes ownership of the request and produces a response. The
//! router stores handlers behind [`BoxHandler`] and never inspects them.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

/// A unit of request handling work.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response>;
}

/// Shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        (**self).call(req)
    }
}

/// Adapter turning an async closure into a [`Handler`]. See [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F>(F);

/// Wrap an async function or closure as a handler.
///
/// ```no_run
/// use netkit::http::handler_fn;
/// let hello = handler_fn(|_req| async { "hello" });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    HandlerFn(f)
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Erase a handler's concrete type.
pub fn boxed<H: Handler>(handler: H) -> BoxHandler {
    Arc::new(handler)
}
