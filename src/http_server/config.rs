//! HTTP Server Configuration
//!
//! Bind address, CORS origins and listing page limits.

use serde::{Deserialize, Serialize};

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 9999)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Page size when a listing request has no `count`
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Upper bound applied to `count`
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9999
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    1000
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Parses a `host:port` listen address. An empty host (":9999") binds
    /// every interface.
    pub fn parse_listen(listen: &str) -> Option<(String, u16)> {
        let (host, port) = listen.rsplit_once(':')?;
        let port = port.parse().ok()?;
        let host = match host {
            "" => "0.0.0.0",
            h => h.trim_start_matches('[').trim_end_matches(']'),
        };
        Some((host.to_string(), port))
    }

    /// Page size to use for a request that asked for `requested`
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
