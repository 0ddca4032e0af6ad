//! Response helpers for handlers.
//!
//! # Responsibilities
//! - Build raw, text, HTML and JSON responses with the right Content-Type
//! - Render error responses as `{"code", "status", "error"}` JSON
//! - Decode JSON request bodies
//!
//! # Design Decisions
//! - Helpers never fail: encoding problems become a 500 JSON error
//! - Error bodies are always JSON so clients can parse them uniformly

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Response with an explicit content type.
pub fn raw(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body.into(),
    )
        .into_response()
}

pub fn text(status: StatusCode, body: impl Into<String>) -> Response {
    raw(status, "text/plain; charset=utf-8", body.into())
}

pub fn html(status: StatusCode, body: impl Into<String>) -> Response {
    raw(status, "text/html; charset=utf-8", body.into())
}

/// Serialize `data` as the JSON body.
pub fn json<T: Serialize>(status: StatusCode, data: &T) -> Response {
    match serde_json::to_vec(data) {
        Ok(bytes) => raw(status, "application/json", bytes),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode JSON response");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "response encoding failed")
        }
    }
}

/// JSON error response carrying `message`.
pub fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        code: status.as_u16(),
        status: status.canonical_reason().unwrap_or("Unknown").to_string(),
        error: message.into(),
    };
    // ErrorBody only holds strings and an integer, so encoding cannot fail.
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    raw(status, "application/json", bytes)
}

/// Error response whose message is the status' canonical reason.
pub fn status_error(status: StatusCode) -> Response {
    error_json(status, status.canonical_reason().unwrap_or("Unknown"))
}

pub fn not_found() -> Response {
    status_error(StatusCode::NOT_FOUND)
}

pub fn bad_request() -> Response {
    status_error(StatusCode::BAD_REQUEST)
}

/// 405 response listing the methods that would have matched.
pub fn method_not_allowed(allowed: &[Method]) -> Response {
    let mut response = status_error(StatusCode::METHOD_NOT_ALLOWED);
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

/// Redirect to `location` with the given 3xx status.
pub fn redirect(status: StatusCode, location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = status.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => {
            tracing::error!(location = %location, "Redirect target is not a valid header value");
            status_error(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Read the request body (at most `limit` bytes) and decode it as JSON.
///
/// On failure the error is a ready-made 400 response.
pub async fn read_json<T: DeserializeOwned>(req: Request<Body>, limit: usize) -> Result<T, Response> {
    let bytes = axum::body::to_bytes(req.into_body(), limit)
        .await
        .map_err(|e| error_json(StatusCode::BAD_REQUEST, format!("unreadable body: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| error_json(StatusCode::BAD_REQUEST, format!("invalid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_error_json_body() {
        let response = error_json(StatusCode::IM_A_TEAPOT, "short and stout");
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body: ErrorBody = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(
            body,
            ErrorBody {
                code: 418,
                status: "I'm a teapot".into(),
                error: "short and stout".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_json_helper() {
        let response = json(StatusCode::CREATED, &serde_json::json!({"id": 7}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_of(response).await, br#"{"id":7}"#.to_vec());
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response = method_not_allowed(&[Method::GET, Method::PUT]);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, PUT");
    }

    #[test]
    fn test_redirect() {
        let response = redirect(StatusCode::TEMPORARY_REDIRECT, "/new/home");
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/new/home");
    }

    #[tokio::test]
    async fn test_read_json() {
        #[derive(serde::Deserialize)]
        struct Job {
            name: String,
        }

        let req = Request::builder()
            .body(Body::from(r#"{"name":"build"}"#))
            .unwrap();
        let job: Job = read_json(req, 1024).await.unwrap();
        assert_eq!(job.name, "build");

        let req = Request::builder().body(Body::from("not json")).unwrap();
        let err = read_json::<Job>(req, 1024).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
