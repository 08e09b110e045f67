//! Connection configuration types.

use std::time::Duration;

/// Default port for IMAP over implicit TLS.
pub const DEFAULT_TLS_PORT: u16 = 993;

/// IMAP connection configuration.
///
/// Timeouts are optional. When unset, connect and I/O calls wait for as long
/// as the server takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Bound on TCP connect plus TLS handshake.
    pub connect_timeout: Option<Duration>,
    /// Bound on each command round trip.
    pub io_timeout: Option<Duration>,
}

impl Config {
    /// Creates a new configuration for implicit TLS on port 993 with no timeouts.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_TLS_PORT,
            connect_timeout: None,
            io_timeout: None,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Returns the `host:port` address string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            connect_timeout: None,
            io_timeout: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    /// Applies the same optional bound to both connect and I/O.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self.io_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or(DEFAULT_TLS_PORT),
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.io_timeout, None);
        assert_eq!(config.address(), "imap.example.com:993");
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .port(1993)
            .connect_timeout(Duration::from_secs(10))
            .build();

        assert_eq!(config.port, 1993);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.io_timeout, None);
    }

    #[test]
    fn test_config_builder_shared_timeout() {
        let config = Config::builder("imap.example.com")
            .timeout(Some(Duration::from_secs(20)))
            .build();

        assert_eq!(config.port, 993);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.io_timeout, Some(Duration::from_secs(20)));

        let unbounded = Config::builder("imap.example.com").timeout(None).build();
        assert_eq!(unbounded, Config::new("imap.example.com"));
    }
}
