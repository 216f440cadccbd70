//! # Portico
//!
//! A convenience layer over an HTTP server: register route handlers,
//! compose a middleware chain around them, and run the server with
//! interrupt-driven graceful shutdown.
//!
//! Handlers come in two calling conventions, selected once when the
//! builder is finished:
//!
//! - **direct**: `async fn(Request) -> Response`, the raw shape
//! - **contextual**: `async fn(Exchange) -> Response`, one cohesive value
//!   carrying the request, the server identity and JSON helpers
//!
//! The convention is part of the server's type, so registering a handler
//! or middleware of the wrong shape is a compile error rather than a
//! startup failure.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use portico::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     portico::logging::init(&portico::logging::LogConfig::development())?;
//!
//!     let mut server = ServerBuilder::new()
//!         .addr("0.0.0.0:8080")
//!         .app_name("inventory")
//!         .build_contextual();
//!
//!     server.add_middleware(ContextRequestLog::new());
//!     server.get("/items/{id}", |cx: Exchange| async move {
//!         cx.json(&serde_json::json!({"path": cx.path()}))
//!     })?;
//!
//!     // Blocks until SIGTERM/SIGINT, then drains in-flight requests.
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/portico/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use portico_core as core;
pub use portico_middleware as middleware;
pub use portico_server as server;

pub mod logging;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use portico::prelude::*;
/// ```
pub mod prelude {
    pub use portico_core::{ContextHandler, Exchange, Handler, Request, Response};

    pub use portico_middleware::stages::{ContextRequestLog, RequestId, RequestLog};
    pub use portico_middleware::{
        Chain, ContextChain, ContextMiddleware, ContextNext, FnContextMiddleware, FnMiddleware,
        Middleware, Next,
    };

    pub use portico_server::{
        BoundServer, ConfigError, Contextual, Direct, LifecycleState, Server, ServerBuilder,
        ServerConfig, ServerError, ShutdownSignal,
    };
}
