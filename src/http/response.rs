//! HTTP response building helpers
//!
//! Every handler answers with JSON. Failures share one body shape,
//! `{"message", "code", "status"}`, where `code` is the numeric status and
//! `status` its reason phrase.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use crate::error::CairisError;

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

/// `{"message": ...}` with 200 OK, for updates and deletes
pub fn message(text: impl Into<String>) -> Response<Full<Bytes>> {
    ok(&json!({ "message": text.into() }))
}

/// `{"<entity>_id": id, "message": ...}` with 200 OK, for creates
pub fn created(id_key: &str, id: i64, text: impl Into<String>) -> Response<Full<Bytes>> {
    let mut body = serde_json::Map::new();
    body.insert(id_key.to_string(), json!(id));
    body.insert("message".to_string(), json!(text.into()));
    ok(&body)
}

/// Status a `CairisError` kind is reported with
pub fn status_for(error: &CairisError) -> StatusCode {
    match error {
        CairisError::NotFound(_) => StatusCode::NOT_FOUND,
        CairisError::Conflict(_) => StatusCode::CONFLICT,
        CairisError::MissingParameter(_)
        | CairisError::MalformedInput(_)
        | CairisError::SessionMissing(_) => StatusCode::BAD_REQUEST,
        CairisError::Upstream(_) | CairisError::SessionUnavailable(_) => StatusCode::CONFLICT,
        CairisError::Io(_) | CairisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error body with an explicit status
pub fn error_body(status: StatusCode, text: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &json!({
            "message": text,
            "code": status.as_u16(),
            "status": status.canonical_reason().unwrap_or("Error"),
        }),
    )
}

/// Convert a `CairisError` to an appropriate HTTP response
pub fn error_response(error: CairisError) -> Response<Full<Bytes>> {
    let status = status_for(&error);
    if status.is_server_error() {
        error!(error = %error, "Request failed");
    } else {
        debug!(status = status.as_u16(), error = %error, "Request rejected");
    }
    error_body(status, &error.to_string())
}

/// Build a 404 for a path no route matches
pub fn route_not_found(path: &str) -> Response<Full<Bytes>> {
    error_body(StatusCode::NOT_FOUND, &format!("No resource at {}", path))
}

/// Build a 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    error_body(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Result type alias for handlers
pub type HandlerResult = Result<Response<Full<Bytes>>, CairisError>;

/// Wrap a handler result into an HTTP response
pub fn from_result(result: HandlerResult) -> Response<Full<Bytes>> {
    result.unwrap_or_else(error_response)
}
