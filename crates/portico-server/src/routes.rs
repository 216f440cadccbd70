//! Route registration and dispatch.
//!
//! The table is a thin accumulator: it stores bindings in registration
//! order and matches them segment by segment at dispatch time. A `{name}`
//! segment matches any single non-empty path segment; no parameter values
//! are extracted. First match wins, and duplicates are rejected at
//! registration, so ordering never silently changes behavior.
//!
//! The table is generic over the stored handler so the same dispatch logic
//! serves both calling conventions.

use http::Method;

use crate::error::ConfigError;

/// Methods accepted by the registration API.
const SUPPORTED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// One segment of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Matches exactly this text.
    Literal(String),

    /// Matches any single non-empty segment.
    Wildcard,
}

/// One registered binding.
#[derive(Debug)]
struct Route<H> {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    handler: H,
}

/// Ordered mapping from (method, pattern) to a handler.
///
/// Mutated only during the setup phase; the running server holds it behind
/// a shared immutable reference.
#[derive(Debug)]
pub struct RouteTable<H> {
    entries: Vec<Route<H>>,
}

impl<H> RouteTable<H> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers `handler` under `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedMethod`] for methods outside
    /// GET/POST/PUT/DELETE, [`ConfigError::InvalidPattern`] for patterns
    /// not starting with `/`, and [`ConfigError::DuplicateRoute`] when the
    /// (method, pattern) pair is already bound.
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<(), ConfigError> {
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(ConfigError::UnsupportedMethod(method));
        }
        if !pattern.starts_with('/') {
            return Err(ConfigError::InvalidPattern(pattern.to_string()));
        }
        if self
            .entries
            .iter()
            .any(|route| route.method == method && route.pattern == pattern)
        {
            return Err(ConfigError::DuplicateRoute {
                method,
                pattern: pattern.to_string(),
            });
        }

        self.entries.push(Route {
            method,
            segments: parse_pattern(pattern),
            pattern: pattern.to_string(),
            handler,
        });
        Ok(())
    }

    /// Finds the handler for `method` and `path`, in registration order.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<&H> {
        self.entries
            .iter()
            .find(|route| route.method == *method && matches_path(&route.segments, path))
            .map(|route| &route.handler)
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the registered (method, pattern) pairs.
    pub fn bindings(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.entries
            .iter()
            .map(|route| (&route.method, route.pattern.as_str()))
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a `/`-rooted pattern into segments.
fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .skip(1)
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2 {
                Segment::Wildcard
            } else {
                Segment::Literal(segment.to_string())
            }
        })
        .collect()
}

/// Matches a `/`-rooted request path against parsed segments.
fn matches_path(segments: &[Segment], path: &str) -> bool {
    let mut parts = path.split('/').skip(1);
    let mut segments = segments.iter();

    loop {
        match (segments.next(), parts.next()) {
            (None, None) => return true,
            (Some(Segment::Literal(literal)), Some(part)) if literal == part => {}
            (Some(Segment::Wildcard), Some(part)) if !part.is_empty() => {}
            _ => return false,
        }
    }
}
