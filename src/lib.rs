//! Tailnet DNS - An authoritative DNS server for the devices of a tailnet.
//!
//! This crate serves A, AAAA and CNAME records for a single domain, built from
//! the device list of a tailnet directory API. The directory is polled on a
//! fixed interval; each successful poll produces a fresh name table that is
//! swapped in atomically while queries keep being answered.
//!
//! ## Features
//!
//! - Short device names (`host1.tailnet.ts.net` → `host1.<domain>`)
//! - CNAME aliases derived from device tags (`tag:cname-api` → `api.<domain>`)
//! - Lock-free reads of the active table during refreshes
//! - Failed refreshes keep serving the last good table
//! - Graceful shutdown support
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         tailnet-dns                            │
//! │                                                                │
//! │  ┌──────────────────┐    ┌──────────────────┐                  │
//! │  │ Directory Client │───▶│ Refresh Scheduler│                  │
//! │  │ (HTTP, every N s)│    │ build + install  │                  │
//! │  └──────────────────┘    └────────┬─────────┘                  │
//! │                                   ▼                            │
//! │                          ┌──────────────────┐                  │
//! │                          │  Registry Store  │ (atomic swap)    │
//! │                          └────────┬─────────┘                  │
//! │                                   ▼                            │
//! │                          ┌──────────────────┐                  │
//! │                          │  Hickory DNS     │◀── UDP/TCP       │
//! │                          │  Server          │                  │
//! │                          └──────────────────┘                  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## DNS Resolution
//!
//! ```text
//! api.ts.example.com  A
//!   → short name "api" is an alias of "host1"
//!   → CNAME host1.ts.example.com.
//!   → A     10.0.0.1 (at host1.ts.example.com.)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use tailnet_dns::{DirectoryConfig, DnsConfig, DnsServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dns = DnsConfig {
//!         listen_addr: "[::]:8053".parse().unwrap(),
//!         domain: "ts.example.com".to_string(),
//!         ttl: 60,
//!     };
//!     let directory = DirectoryConfig {
//!         tailnet: "example.org".to_string(),
//!         api_key: std::env::var("TS_API_KEY").unwrap(),
//!         api_url: "https://api.tailscale.com".to_string(),
//!         refresh_interval: 300,
//!         request_timeout: 10,
//!         alias_tag_prefix: "cname-".to_string(),
//!     };
//!
//!     let shutdown = CancellationToken::new();
//!     DnsServer::new(dns, directory).run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod authority;
pub mod config;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod refresh;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DirectoryConfig, DnsConfig, TelemetryConfig};
pub use directory::{DeviceRecord, DeviceSource, DirectoryClient};
pub use error::DnsError;
pub use registry::{NameEntry, Registry, RegistryStore};
pub use resolver::{resolve, Answer, QueryType};
pub use server::DnsServer;
