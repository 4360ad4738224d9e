//! Configuration types for tailnet-dns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::DnsError;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    pub dns: DnsConfig,

    /// Device directory configuration.
    pub directory: DirectoryConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), DnsError> {
        if self.dns.domain.trim_matches('.').is_empty() {
            return Err(DnsError::Config("dns.domain must not be empty".into()));
        }
        if self.directory.tailnet.is_empty() {
            return Err(DnsError::Config("directory.tailnet must not be empty".into()));
        }
        if self.directory.refresh_interval == 0 {
            return Err(DnsError::Config(
                "directory.refresh_interval must be at least 1 second".into(),
            ));
        }
        if self.directory.request_timeout == 0 {
            return Err(DnsError::Config(
                "directory.request_timeout must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for DNS server to listen on (UDP and TCP).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Domain suffix served by this instance (e.g., "ts.example.com").
    /// Device short names are answered as `<name>.<domain>`.
    pub domain: String,

    /// TTL for DNS records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl DnsConfig {
    /// Served domain without leading or trailing dots.
    pub fn zone(&self) -> &str {
        self.domain.trim_matches('.')
    }
}

/// Device directory (tailnet API) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Tailnet name whose devices are served.
    pub tailnet: String,

    /// API key, sent as the HTTP Basic user name.
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Base URL of the directory API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Seconds between background refreshes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Timeout for a single directory request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Tags of the form `tag:<prefix><alias>` publish `<alias>` as a CNAME.
    #[serde(default = "default_alias_tag_prefix")]
    pub alias_tag_prefix: String,
}

impl DirectoryConfig {
    /// Interval between background refreshes.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    /// Timeout applied to each directory request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("tailnet", &self.tailnet)
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("refresh_interval", &self.refresh_interval)
            .field("request_timeout", &self.request_timeout)
            .field("alias_tag_prefix", &self.alias_tag_prefix)
            .finish()
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "tailnet_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,

    /// OpenTelemetry configuration.
    #[serde(default)]
    pub opentelemetry: Option<OpenTelemetryConfig>,
}

/// OpenTelemetry exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTelemetryConfig {
    /// OTLP endpoint (e.g., "http://localhost:4317").
    pub endpoint: String,

    /// Service name for traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
            opentelemetry: None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0u16; 8], 8053))
}

fn default_ttl() -> u32 {
    60
}

fn default_api_url() -> String {
    "https://api.tailscale.com".to_string()
}

fn default_refresh_interval() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    10
}

fn default_alias_tag_prefix() -> String {
    "cname-".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "tailnet-dns".to_string()
}
