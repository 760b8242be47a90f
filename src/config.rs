//! Server and transport configuration.

use std::net::SocketAddr;
use std::time::Duration;

// ── ServerConfig ──────────────────────────────────────────────────────────────

/// Configuration for [`Server`](crate::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// How long in-flight connections may run after a shutdown signal before
    /// they are aborted.
    ///
    /// Kubernetes waits `terminationGracePeriodSeconds` (30 s by default)
    /// before SIGKILL; keep this below that.
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            drain_timeout: Duration::from_secs(25),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    addr: Option<SocketAddr>,
    drain_timeout: Option<Duration>,
}

impl ServerConfigBuilder {
    #[must_use]
    pub const fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    #[must_use]
    pub const fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn build(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            addr: self.addr.unwrap_or(defaults.addr),
            drain_timeout: self.drain_timeout.unwrap_or(defaults.drain_timeout),
        }
    }
}

// ── TransportConfig ───────────────────────────────────────────────────────────

/// Configuration for [`HttpTransport`](crate::transport::HttpTransport).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on one round trip, from sending the request to receiving
    /// the response head.
    pub timeout: Duration,
    /// Idle pooled connections are closed after this long.
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
}

impl TransportConfigBuilder {
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn pool_max_idle_per_host(mut self, count: usize) -> Self {
        self.pool_max_idle_per_host = Some(count);
        self
    }

    #[must_use]
    pub fn build(self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            pool_max_idle_per_host: self
                .pool_max_idle_per_host
                .unwrap_or(defaults.pool_max_idle_per_host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.drain_timeout, Duration::from_secs(25));
    }

    #[test]
    fn server_builder_overrides() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ServerConfig::builder()
            .addr(addr)
            .drain_timeout(Duration::from_millis(100))
            .build();

        assert_eq!(config.addr, addr);
        assert_eq!(config.drain_timeout, Duration::from_millis(100));
    }

    #[test]
    fn transport_builder_keeps_unset_defaults() {
        let config = TransportConfig::builder()
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(90));
        assert_eq!(config.pool_max_idle_per_host, 32);
    }
}
