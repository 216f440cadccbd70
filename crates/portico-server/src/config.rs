//! Server configuration.
//!
//! [`ServerConfig`] is immutable once built; every field has a documented
//! default so `ServerConfig::default()` is a fully working configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Default read timeout in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 20;

/// Default write timeout in seconds.
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 50;

/// Default idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 50;

/// Default graceful shutdown deadline in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default application name.
pub const DEFAULT_APP_NAME: &str = "MyAPIServer";

/// Default application version.
pub const DEFAULT_APP_VERSION: &str = "1.0.0";

/// Default application author.
pub const DEFAULT_APP_AUTHOR: &str = "Ghost";

/// Immutable server configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances; unset fields
/// take the documented defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:8080`.
    addr: String,

    /// Externally visible host name, when one exists.
    host_name: Option<String>,

    /// Application name, logged at startup and exposed to handlers.
    app_name: String,

    /// Application version, logged at startup.
    app_version: String,

    /// Application author, logged at startup.
    app_author: String,

    /// Bound on reading one request (headers and body).
    read_timeout: Duration,

    /// Bound on producing one response (handler execution included).
    write_timeout: Duration,

    /// Bound on keep-alive idle time between requests.
    idle_timeout: Duration,

    /// Bound on draining in-flight requests during shutdown.
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the listen address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Parses the listen address into a `SocketAddr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.addr.parse()
    }

    /// Returns the configured host name, if any.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.host_name.as_deref()
    }

    /// Returns the application name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the application version.
    #[must_use]
    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Returns the application author.
    #[must_use]
    pub fn app_author(&self) -> &str {
        &self.app_author
    }

    /// Returns the read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the write timeout.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Returns the idle timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the graceful shutdown deadline.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    addr: String,
    host_name: Option<String>,
    app_name: String,
    app_version: String,
    app_author: String,
    read_timeout: Duration,
    write_timeout: Duration,
    idle_timeout: Duration,
    shutdown_timeout: Duration,
}

impl ServerConfigBuilder {
    /// Creates a builder preloaded with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            host_name: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            app_author: DEFAULT_APP_AUTHOR.to_string(),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }

    /// Sets the listen address.
    #[must_use]
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Sets the externally visible host name.
    #[must_use]
    pub fn host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    /// Sets the application name.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Sets the application version.
    #[must_use]
    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    /// Sets the application author.
    #[must_use]
    pub fn app_author(mut self, author: impl Into<String>) -> Self {
        self.app_author = author.into();
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the graceful shutdown deadline.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            host_name: self.host_name,
            app_name: self.app_name,
            app_version: self.app_version,
            app_author: self.app_author,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            idle_timeout: self.idle_timeout,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_exactly_as_documented() {
        let config = ServerConfig::default();

        assert_eq!(config.addr(), "0.0.0.0:8080");
        assert_eq!(config.read_timeout(), Duration::from_secs(20));
        assert_eq!(config.write_timeout(), Duration::from_secs(50));
        assert_eq!(config.idle_timeout(), Duration::from_secs(50));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.app_name(), "MyAPIServer");
        assert_eq!(config.app_version(), "1.0.0");
        assert_eq!(config.app_author(), "Ghost");
        assert!(config.host_name().is_none());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ServerConfig::builder()
            .addr("127.0.0.1:3000")
            .host_name("api.example.com")
            .app_name("inventory")
            .app_version("2.3.1")
            .app_author("Platform Team")
            .read_timeout(Duration::from_secs(5))
            .write_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(15))
            .shutdown_timeout(Duration::from_secs(60))
            .build();

        assert_eq!(config.addr(), "127.0.0.1:3000");
        assert_eq!(config.host_name(), Some("api.example.com"));
        assert_eq!(config.app_name(), "inventory");
        assert_eq!(config.app_version(), "2.3.1");
        assert_eq!(config.app_author(), "Platform Team");
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
        assert_eq!(config.idle_timeout(), Duration::from_secs(15));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn socket_addr_parses_valid_addresses() {
        let config = ServerConfig::builder().addr("127.0.0.1:8081").build();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 8081);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn socket_addr_rejects_garbage() {
        let config = ServerConfig::builder().addr("not-an-address").build();
        assert!(config.socket_addr().is_err());
    }
}
