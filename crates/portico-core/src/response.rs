//! JSON response helpers.
//!
//! All responses produced by the dispatch layer are JSON. Serialization
//! failures on the way out are swallowed here: the error is logged and a
//! fixed 500 body is returned instead, because the response has already
//! been committed from the caller's point of view.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::types::Response;

/// Fixed body returned when response serialization fails.
const INTERNAL_ERROR_BODY: &[u8] = br#"{"error": "Internal Server Error"}"#;

/// Serializes `value` into a JSON response with the given status.
///
/// On serialization failure the error is logged and a 500 response with a
/// fixed JSON body is returned; the failure is not propagated.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => http::Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| internal_error()),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize response body");
            internal_error()
        }
    }
}

/// Builds a JSON error response of the shape `{"error": <message>}`.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    json(status, &serde_json::json!({ "error": message }))
}

/// Builds the standard 404 response for an unmatched path.
pub fn not_found(path: &str) -> Response {
    json(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "Not Found", "path": path }),
    )
}

/// The fixed 500 response used when serialization itself fails.
fn internal_error() -> Response {
    let mut response = http::Response::new(Full::new(Bytes::from_static(INTERNAL_ERROR_BODY)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
