//! The per-request context value for the contextual calling convention.
//!
//! An [`Exchange`] wraps a single request/response round: the request head
//! and its fully buffered body, plus the server identity configured at
//! startup. One exchange is created per request by the dispatch layer and
//! dropped when the handler returns; it is never shared across requests.

use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::response;
use crate::types::Response;

/// Context passed to contextual handlers and middleware.
///
/// Owns the buffered request for the duration of one handler invocation.
/// The body buffer is released when the exchange is dropped, on success
/// and failure paths alike.
#[derive(Debug)]
pub struct Exchange {
    /// Request head (method, URI, headers).
    head: Parts,

    /// Fully collected request body.
    body: Bytes,

    /// Externally visible host name, when one was configured.
    host_name: Option<Arc<str>>,

    /// Application name from the server configuration.
    app_name: Arc<str>,
}

impl Exchange {
    /// Creates an exchange from a collected request and the server identity.
    #[must_use]
    pub fn new(head: Parts, body: Bytes, host_name: Option<Arc<str>>, app_name: Arc<str>) -> Self {
        Self {
            head,
            body,
            host_name,
            app_name,
        }
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Returns the full request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns the buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the configured host name, if any.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.host_name.as_deref()
    }

    /// Returns the configured application name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Serializes `value` into a 200 JSON response.
    ///
    /// On serialization failure the error is logged and a 500 response with
    /// the fixed body `{"error": "Internal Server Error"}` is returned; the
    /// failure is never propagated to the handler.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Response {
        response::json(StatusCode::OK, value)
    }

    /// Serializes `value` into a JSON response with an explicit status.
    pub fn json_with_status<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        value: &T,
    ) -> Response {
        response::json(status, value)
    }

    /// Deserializes the request body into `T`.
    ///
    /// Decode failures are returned to the caller; they never abort the
    /// server. The body buffer stays owned by the exchange either way.
    pub fn read_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde::Deserialize;

    fn exchange_with_body(body: &str) -> Exchange {
        let (head, ()) = http::Request::builder()
            .method(Method::POST)
            .uri("/echo?verbose=1")
            .header("content-type", "application/json")
            .body(())
            .unwrap()
            .into_parts();
        Exchange::new(
            head,
            Bytes::copy_from_slice(body.as_bytes()),
            Some(Arc::from("api.example.com")),
            Arc::from("demo"),
        )
    }

    fn body_string(response: Response) -> String {
        let collected = tokio_test::block_on(response.into_body().collect()).unwrap();
        String::from_utf8(collected.to_bytes().to_vec()).unwrap()
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: u32,
        active: bool,
        tags: Vec<String>,
        note: Option<String>,
        nested: Nested,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nested {
        ratio: f64,
    }

    #[test]
    fn accessors_expose_request_head() {
        let cx = exchange_with_body("{}");
        assert_eq!(cx.method(), Method::POST);
        assert_eq!(cx.path(), "/echo");
        assert_eq!(cx.uri().query(), Some("verbose=1"));
        assert_eq!(cx.host_name(), Some("api.example.com"));
        assert_eq!(cx.app_name(), "demo");
    }

    #[test]
    fn json_round_trip_preserves_value() {
        let record = Record {
            name: "alpha".to_string(),
            count: 3,
            active: true,
            tags: vec!["a".to_string(), "b".to_string()],
            note: None,
            nested: Nested { ratio: 0.5 },
        };

        let cx = exchange_with_body("{}");
        let response = cx.json(&record);
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response);
        let cx = exchange_with_body(&body);
        let decoded: Record = cx.read_json().unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn read_json_decodes_arbitrary_values() {
        let cx = exchange_with_body(r#"{"a":[1,2,null],"b":{"c":"x"},"d":true}"#);
        let value: serde_json::Value = cx.read_json().unwrap();
        assert_eq!(value["a"][2], serde_json::Value::Null);
        assert_eq!(value["b"]["c"], "x");
    }

    #[test]
    fn read_json_propagates_decode_errors() {
        let cx = exchange_with_body("not json at all");
        let result: Result<serde_json::Value, _> = cx.read_json();
        assert!(result.is_err());
        // The exchange and its body buffer are still usable afterwards.
        assert_eq!(cx.body().len(), 15);
    }

    #[test]
    fn json_with_status_overrides_status() {
        let cx = exchange_with_body("{}");
        let response = cx.json_with_status(StatusCode::CREATED, &serde_json::json!({"id": 1}));
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
