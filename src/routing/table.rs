//! Route registration and resolution.
//!
//! # Responsibilities
//! - Validate and store route entries keyed by `method + pattern`
//! - Resolve `(method, path)` to a handler and its captured parameters
//! - Tell "no such path" apart from "path exists, wrong method"
//!
//! # Design Decisions
//! - Registration takes `&mut self`; once a table is shared behind an `Arc`
//!   it can no longer change, so resolution needs no locking
//! - Exact lookup first, then a scan of prefix and parameterised patterns
//!   sorted longest first, so the most specific pattern wins
//! - Registration errors are returned, never panicked

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use serde::Serialize;
use thiserror::Error;

use crate::http::handler::{boxed, BoxHandler, Handler};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::pattern::{PathParams, Pattern, PatternError};
use crate::routing::radix::RadixTree;

/// Method a route answers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// Every method (`*`).
    Any,
    Only(Method),
}

impl RouteMethod {
    /// Token used as the radix key prefix.
    pub fn token(&self) -> &str {
        match self {
            RouteMethod::Any => "*",
            RouteMethod::Only(method) => method.as_str(),
        }
    }

    pub fn allows(&self, method: &Method) -> bool {
        match self {
            RouteMethod::Any => true,
            RouteMethod::Only(only) => only == method,
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Only(method)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Registration failures. All of them are programming errors caught at boot.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("multiple registrations for {method} {pattern}")]
    Duplicate { method: RouteMethod, pattern: String },

    #[error("group prefix {prefix:?} must be a literal path without parameters")]
    ParameterisedPrefix { prefix: String },
}

/// One registered route. Immutable once registered.
pub struct RouteEntry {
    method: RouteMethod,
    pattern: Pattern,
    handler: BoxHandler,
}

impl RouteEntry {
    pub fn method(&self) -> &RouteMethod {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn handler(&self) -> &BoxHandler {
        &self.handler
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

fn route_key(method: &str, pattern: &str) -> String {
    let mut key = String::with_capacity(method.len() + pattern.len());
    key.push_str(method);
    key.push_str(pattern);
    key
}

/// A successful resolution.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub params: PathParams,
}

/// Outcome of [`RouteTable::resolve`].
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched(RouteMatch<'a>),
    /// Some pattern matches the path, but none for the request method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

impl Resolution<'_> {
    fn outcome(&self) -> &'static str {
        match self {
            Resolution::Matched(_) => "matched",
            Resolution::MethodNotAllowed { .. } => "method_not_allowed",
            Resolution::NotFound => "not_found",
        }
    }
}

/// Serializable description of a route, used by the route listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub pattern: String,
    pub kind: RouteKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Exact,
    Prefix,
    Param,
}

/// The route table.
#[derive(Default)]
pub struct RouteTable {
    routes: RadixTree<Arc<RouteEntry>>,
    /// Prefix and parameterised entries, longest pattern first.
    scanned: Vec<Arc<RouteEntry>>,
    /// Distinct method tokens seen at registration.
    methods: Vec<RouteMethod>,
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes.len())
            .field("scanned", &self.scanned.len())
            .finish()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Register `handler` for `method` requests matching `pattern`.
    pub fn handle(
        &mut self,
        method: impl Into<RouteMethod>,
        pattern: &str,
        handler: impl Handler,
    ) -> Result<(), RouteError> {
        self.insert(method.into(), pattern, boxed(handler))
    }

    pub(crate) fn insert(
        &mut self,
        method: RouteMethod,
        pattern: &str,
        handler: BoxHandler,
    ) -> Result<(), RouteError> {
        let compiled = Pattern::parse(pattern).map_err(|source| RouteError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;

        let key = route_key(method.token(), pattern);
        if self.routes.contains_key(&key) {
            return Err(RouteError::Duplicate {
                method,
                pattern: pattern.to_owned(),
            });
        }

        let entry = Arc::new(RouteEntry {
            method: method.clone(),
            pattern: compiled,
            handler,
        });

        if entry.pattern.is_prefix() || !entry.pattern.is_static() {
            let len = pattern.len();
            let at = self
                .scanned
                .partition_point(|other| other.pattern.as_str().len() >= len);
            self.scanned.insert(at, entry.clone());
        }
        if !self.methods.contains(&method) {
            self.methods.push(method.clone());
        }
        self.routes.insert(key, entry);

        tracing::debug!(method = %method, pattern = %pattern, "Route registered");
        Ok(())
    }

    pub fn get(&mut self, pattern: &str, handler: impl Handler) -> Result<(), RouteError> {
        self.handle(Method::GET, pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: impl Handler) -> Result<(), RouteError> {
        self.handle(Method::POST, pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: impl Handler) -> Result<(), RouteError> {
        self.handle(Method::PUT, pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Handler) -> Result<(), RouteError> {
        self.handle(Method::DELETE, pattern, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: impl Handler) -> Result<(), RouteError> {
        self.handle(Method::PATCH, pattern, handler)
    }

    /// Register `handler` for every method.
    pub fn any(&mut self, pattern: &str, handler: impl Handler) -> Result<(), RouteError> {
        self.handle(RouteMethod::Any, pattern, handler)
    }

    /// Answer GET requests for `old` with a temporary redirect to `new`.
    pub fn forward(&mut self, old: &str, new: &str) -> Result<(), RouteError> {
        let target = new.to_owned();
        self.get(
            old,
            crate::http::handler_fn(move |_req: Request<Body>| {
                let target = target.clone();
                async move { response::redirect(StatusCode::TEMPORARY_REDIRECT, &target) }
            }),
        )
    }

    /// Resolve a request method and path.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        if let Some(entry) = self.exact(method.as_str(), path) {
            return Resolution::Matched(RouteMatch {
                entry,
                params: PathParams::new(),
            });
        }
        if let Some(entry) = self.exact(RouteMethod::Any.token(), path) {
            return Resolution::Matched(RouteMatch {
                entry,
                params: PathParams::new(),
            });
        }

        for entry in &self.scanned {
            if !entry.method.allows(method) {
                continue;
            }
            if let Some(params) = entry.pattern.matches(path) {
                return Resolution::Matched(RouteMatch {
                    entry: entry.as_ref(),
                    params,
                });
            }
        }

        let allowed = self.allowed_methods(path);
        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }

    /// Exact hit on a parameter-free pattern.
    fn exact(&self, token: &str, path: &str) -> Option<&RouteEntry> {
        let entry = self.routes.get(route_key(token, path))?;
        entry.pattern.is_static().then_some(entry.as_ref())
    }

    fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = Vec::new();
        let mut add = |method: &RouteMethod| {
            if let RouteMethod::Only(m) = method {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        };

        for method in &self.methods {
            if self.exact(method.token(), path).is_some() {
                add(method);
            }
        }
        for entry in &self.scanned {
            if entry.pattern.matches(path).is_some() {
                add(&entry.method);
            }
        }
        allowed
    }

    /// Resolve `req`, attach its path parameters and run the matched handler.
    pub async fn dispatch(&self, mut req: Request<Body>) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let resolution = self.resolve(&method, &path);
        metrics::record_resolution(resolution.outcome());

        match resolution {
            Resolution::Matched(RouteMatch { entry, params }) => {
                tracing::debug!(
                    method = %method,
                    path = %path,
                    pattern = %entry.pattern(),
                    params = params.len(),
                    "Route matched"
                );
                req.extensions_mut().insert(params);
                entry.handler.call(req).await
            }
            Resolution::MethodNotAllowed { allowed } => {
                tracing::debug!(method = %method, path = %path, ?allowed, "Method not allowed");
                response::method_not_allowed(&allowed)
            }
            Resolution::NotFound => {
                tracing::debug!(method = %method, path = %path, "No route matched");
                response::not_found()
            }
        }
    }

    /// All registered routes in key order.
    pub fn routes(&self) -> Vec<&RouteEntry> {
        let mut out = Vec::with_capacity(self.routes.len());
        self.routes.walk(|_, entry| {
            out.push(entry.as_ref());
            ControlFlow::Continue(())
        });
        out
    }

    /// Route descriptions for listing pages.
    pub fn describe(&self) -> Vec<RouteInfo> {
        self.routes()
            .into_iter()
            .map(|entry| RouteInfo {
                method: entry.method.token().to_owned(),
                pattern: entry.pattern().to_owned(),
                kind: if !entry.pattern.is_static() {
                    RouteKind::Param
                } else if entry.pattern.is_prefix() {
                    RouteKind::Prefix
                } else {
                    RouteKind::Exact
                },
            })
            .collect()
    }

    /// Look up an entry by its exact registration.
    pub fn entry(&self, method: &RouteMethod, pattern: &str) -> Option<&RouteEntry> {
        self.routes
            .get(route_key(method.token(), pattern))
            .map(|entry| entry.as_ref())
    }
}
