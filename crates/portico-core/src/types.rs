//! Common type aliases used throughout the server layer.
//!
//! Bodies are fully buffered before dispatch, so both directions use
//! `Full<Bytes>` rather than streaming body types.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type handlers and middleware receive.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type handlers and middleware produce.
pub type Response = http::Response<Full<Bytes>>;

/// A boxed future, used by the type-erased handler and middleware traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
