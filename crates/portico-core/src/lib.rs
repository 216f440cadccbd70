//! # Portico Core
//!
//! Core types shared by the Portico server layer:
//!
//! - [`Request`] and [`Response`] type aliases over `http` with buffered bodies
//! - The two handler traits, one per calling convention
//! - [`Exchange`], the per-request context value for contextual handlers
//! - JSON response helpers

#![doc(html_root_url = "https://docs.rs/portico-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod exchange;
pub mod handler;
pub mod response;
pub mod types;

pub use exchange::Exchange;
pub use handler::{ContextHandler, Handler};
pub use types::{BoxFuture, Request, Response};
