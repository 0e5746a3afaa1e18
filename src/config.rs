//! Configuration for the guide client
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{GuideError, Result};

/// Default server endpoint
pub const DEFAULT_ENDPOINT: &str = "tcp://localhost:9010";

/// Default reply timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 2500;

/// Main configuration for a guide client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Server endpoint, `tcp://host:port`
    pub endpoint: String,

    /// Upper bound on every wait: connect, handshake and each reply (milliseconds)
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// The reply timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the server endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the reply timeout (in milliseconds)
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Validate and build the config
    pub fn build(self) -> Result<ClientConfig> {
        if self.config.timeout_ms == 0 {
            return Err(GuideError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Endpoint::parse(&self.config.endpoint)?;
        Ok(self.config)
    }
}

// =============================================================================
// Endpoint
// =============================================================================

/// A parsed `tcp://host:port` endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    const TCP_SCHEME: &'static str = "tcp://";

    /// Parse an endpoint string; only the tcp transport is supported
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s.strip_prefix(Self::TCP_SCHEME).ok_or_else(|| {
            GuideError::Config(format!("unsupported endpoint '{}': expected tcp://host:port", s))
        })?;

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| GuideError::Config(format!("endpoint '{}' is missing a port", s)))?;

        // Bracketed IPv6 literals, e.g. tcp://[::1]:9010
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(GuideError::Config(format!("endpoint '{}' is missing a host", s)));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| GuideError::Config(format!("invalid port in endpoint '{}'", s)))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// `host:port` form accepted by `ToSocketAddrs`
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::TCP_SCHEME, self.socket_addr())
    }
}
