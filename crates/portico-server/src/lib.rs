//! # Portico Server
//!
//! Server lifecycle and routing for the Portico convenience layer:
//!
//! - Route registration under one of two statically selected calling
//!   conventions
//! - Middleware composition around the route dispatcher
//! - A Hyper-backed accept loop with interrupt-driven graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use portico_server::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = ServerBuilder::new()
//!         .addr("0.0.0.0:8080")
//!         .app_name("demo")
//!         .build_contextual();
//!
//!     server.get("/hello", |cx: portico_core::Exchange| async move {
//!         cx.json(&serde_json::json!({"hello": cx.app_name()}))
//!     })?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/portico-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{ConfigError, ServerError};
pub use lifecycle::LifecycleState;
pub use routes::RouteTable;
pub use server::{BoundServer, Contextual, Convention, Direct, Server, ServerBuilder};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
