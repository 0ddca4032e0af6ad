//! Route groups: prefix-scoped registration on a [`RouteTable`].
//!
//! # Responsibilities
//! - Register `prefix + pattern` on the owning table
//! - Strip the prefix from the request path before the handler sees it
//! - Compose prefixes when groups are nested
//!
//! # Design Decisions
//! - A group borrows the table mutably, so groups only exist during the
//!   registration phase and nesting forms a tree by construction
//! - The table itself knows nothing about groups

use axum::body::Body;
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::{Method, Request};
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::handler::{boxed, BoxHandler, Handler};
use crate::http::response;
use crate::routing::path::{join, normalize_prefix};
use crate::routing::pattern::Pattern;
use crate::routing::table::{RouteError, RouteMethod, RouteTable};

/// A prefix-scoped view over a route table.
#[derive(Debug)]
pub struct Group<'a> {
    table: &'a mut RouteTable,
    prefix: String,
}

impl RouteTable {
    /// Open a group mounted at `prefix`.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            table: self,
            prefix: normalize_prefix(prefix),
        }
    }
}

impl<'a> Group<'a> {
    /// The normalised prefix of this group.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Open a nested group; its prefix is this group's prefix plus `prefix`.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        let nested = normalize_prefix(prefix);
        Group {
            prefix: normalize_prefix(&join(&self.prefix, &nested)),
            table: &mut *self.table,
        }
    }

    /// Register `handler` for `method` requests on `prefix + pattern`.
    pub fn handle(
        &mut self,
        method: impl Into<RouteMethod>,
        pattern: &str,
        handler: impl Handler,
    ) -> Result<(), RouteError> {
        check_prefix(&self.prefix)?;
        let full = join(&self.prefix, pattern);
        let handler = StripPrefix::wrap(&self.prefix, boxed(handler));
        self.table.insert(method.into(), &full, handler)
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

    pub fn any(&mut self, pattern: &str, handler: impl Handler) -> Result<(), RouteError> {
        self.handle(RouteMethod::Any, pattern, handler)
    }
}

/// A prefix is stripped byte for byte, so it has to be a valid literal path.
fn check_prefix(prefix: &str) -> Result<(), RouteError> {
    let parsed = Pattern::parse(prefix).map_err(|source| RouteError::InvalidPattern {
        pattern: prefix.to_owned(),
        source,
    })?;
    if parsed.is_static() {
        Ok(())
    } else {
        Err(RouteError::ParameterisedPrefix {
            prefix: prefix.to_owned(),
        })
    }
}

/// Handler wrapper removing a fixed prefix from the request path.
struct StripPrefix {
    prefix: String,
    inner: BoxHandler,
}

impl StripPrefix {
    fn wrap(prefix: &str, inner: BoxHandler) -> BoxHandler {
        if prefix == "/" {
            return inner;
        }
        boxed(StripPrefix {
            prefix: prefix.to_owned(),
            inner,
        })
    }
}

impl Handler for StripPrefix {
    fn call(&self, mut req: Request<Body>) -> BoxFuture<'static, Response> {
        let stripped = match strip_uri(req.uri(), &self.prefix) {
            Some(uri) => uri,
            None => {
                tracing::warn!(
                    prefix = %self.prefix,
                    path = %req.uri().path(),
                    "Request path lost its group prefix before dispatch"
                );
                return Box::pin(async { response::not_found() });
            }
        };
        *req.uri_mut() = stripped;
        self.inner.call(req)
    }
}

/// `uri` with `prefix` removed from its path. Query strings survive and an
/// emptied path becomes `/`.
fn strip_uri(uri: &Uri, prefix: &str) -> Option<Uri> {
    let rest = uri.path().strip_prefix(prefix)?;
    let path = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}
