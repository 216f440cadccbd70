//! # Portico Middleware
//!
//! Middleware chain composition for the Portico server layer.
//!
//! There are two independent chain builders, one per calling convention:
//!
//! - [`direct`]: middleware and handlers operate on raw [`Request`] values
//! - [`contextual`]: middleware and handlers operate on [`Exchange`] values
//!
//! The two variants are never mixed on one server instance; the server type
//! selects one of them at construction.
//!
//! ## Composition order
//!
//! A chain is built by folding the middleware list from its tail toward its
//! head, so the first middleware added ends up outermost: it runs first on
//! the way in and last on the way out. An empty list composes to the
//! terminal handler unchanged.
//!
//! ```text
//! request -> mw[0] -> mw[1] -> ... -> mw[n-1] -> handler
//! response <- mw[0] <- mw[1] <- ... <- mw[n-1] <-+
//! ```
//!
//! [`Request`]: portico_core::Request
//! [`Exchange`]: portico_core::Exchange

#![doc(html_root_url = "https://docs.rs/portico-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod contextual;
pub mod direct;
pub mod stages;

pub use contextual::{ContextChain, ContextMiddleware, ContextNext, FnContextMiddleware};
pub use direct::{Chain, FnMiddleware, Middleware, Next};
