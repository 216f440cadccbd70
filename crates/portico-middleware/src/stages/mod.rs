//! Built-in middleware stages.
//!
//! These are optional units an application can append to its chain; none of
//! them is installed implicitly.

pub mod request_id;
pub mod request_log;

pub use request_id::RequestId;
pub use request_log::{ContextRequestLog, RequestLog};
