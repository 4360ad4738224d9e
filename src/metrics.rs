//! Metrics instrumentation for tailnet-dns.
//!
//! All metrics are prefixed with `tailnet_dns.`

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a DNS query.
pub fn record_query(record_type: &str, result: QueryResult, duration: Duration) {
    let result_str = match result {
        QueryResult::Success => "success",
        QueryResult::Empty => "empty",
        QueryResult::NxDomain => "nxdomain",
        QueryResult::Error => "error",
    };

    counter!("tailnet_dns.query.count", "type" => record_type.to_string(), "result" => result_str)
        .increment(1);
    histogram!("tailnet_dns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryResult {
    /// Query returned records.
    Success,
    /// Name exists but has no records of the requested type.
    Empty,
    /// Domain not found.
    NxDomain,
    /// Answer could not be encoded.
    Error,
}

/// Record the outcome of one directory refresh.
pub fn record_refresh(result: RefreshResult, duration: Duration) {
    let result_str = match result {
        RefreshResult::Success => "success",
        RefreshResult::Error => "error",
    };

    counter!("tailnet_dns.refresh.count", "result" => result_str).increment(1);
    histogram!("tailnet_dns.refresh.duration.seconds").record(duration.as_secs_f64());
}

/// Refresh outcomes.
#[derive(Debug, Clone, Copy)]
pub enum RefreshResult {
    /// New registry installed.
    Success,
    /// Fetch or decode failed; previous registry kept.
    Error,
}

/// Record registry size (call on install and periodically).
pub fn record_registry_counts(hosts: usize, aliases: usize) {
    gauge!("tailnet_dns.registry.hosts.count").set(hosts as f64);
    gauge!("tailnet_dns.registry.aliases.count").set(aliases as f64);
}

/// Record the number of registries installed so far.
pub fn record_generation(generation: u64) {
    gauge!("tailnet_dns.registry.generation").set(generation as f64);
}

/// Record how stale the active registry is.
pub fn record_registry_age(age: Duration) {
    gauge!("tailnet_dns.registry.age.seconds").set(age.as_secs_f64());
}

/// Record the gauges for a freshly installed registry.
pub fn record_registry_installed(hosts: usize, aliases: usize, generation: u64) {
    record_registry_counts(hosts, aliases);
    record_generation(generation);
    record_registry_age(Duration::ZERO);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
