//! Error types for server setup and runtime.
//!
//! Setup mistakes surface as [`ConfigError`] values returned from the
//! registration calls, leaving the decision to abort with the embedding
//! application. [`ServerError`] covers the transport and shutdown failures
//! returned from `run`.

use std::time::Duration;

use http::Method;
use thiserror::Error;

/// Errors raised while wiring routes, middleware or prefixes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A handler is already registered under this method and pattern.
    #[error("route {method} {pattern} is already registered")]
    DuplicateRoute {
        /// HTTP method of the conflicting registration.
        method: Method,
        /// Path pattern of the conflicting registration.
        pattern: String,
    },

    /// The method is outside the supported set.
    #[error("method {0} is not supported; use GET, POST, PUT or DELETE")]
    UnsupportedMethod(Method),

    /// The pattern does not start with `/`.
    #[error("route pattern {0:?} must start with '/'")]
    InvalidPattern(String),

    /// A route prefix was already mounted.
    #[error("route prefix is already set to {existing:?}")]
    PrefixAlreadySet {
        /// The previously mounted prefix.
        existing: String,
    },

    /// The prefix is empty or does not start with `/`.
    #[error("route prefix {0:?} must be a non-root path starting with '/'")]
    InvalidPrefix(String),
}

/// Errors returned from running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured listen address could not be parsed.
    #[error("invalid listen address {addr:?}")]
    Addr {
        /// The configured address.
        addr: String,
        /// The parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The graceful shutdown deadline elapsed with connections still open.
    #[error("shutdown deadline of {deadline:?} elapsed with {active} connection(s) still open")]
    ShutdownTimeout {
        /// The configured deadline.
        deadline: Duration,
        /// Connections still open when the deadline elapsed.
        active: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_route_names_the_binding() {
        let err = ConfigError::DuplicateRoute {
            method: Method::GET,
            pattern: "/users".to_string(),
        };
        assert!(err.to_string().contains("GET /users"));
    }

    #[test]
    fn unsupported_method_lists_alternatives() {
        let err = ConfigError::UnsupportedMethod(Method::PATCH);
        assert!(err.to_string().contains("PATCH"));
        assert!(err.to_string().contains("GET, POST, PUT or DELETE"));
    }

    #[test]
    fn shutdown_timeout_reports_stragglers() {
        let err = ServerError::ShutdownTimeout {
            deadline: Duration::from_secs(30),
            active: 2,
        };
        assert!(err.to_string().contains("2 connection(s)"));
    }

    #[test]
    fn bind_error_carries_source() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:80".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
