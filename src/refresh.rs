//! Periodic registry refresh from the device directory.

use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::directory::DeviceSource;
use crate::error::DnsError;
use crate::metrics::{self, RefreshResult, Timer};
use crate::registry::{Registry, RegistryStore};

/// Fetches the device list, builds a registry and installs it.
pub struct RefreshScheduler<S> {
    source: S,
    store: RegistryStore,
    alias_tag_prefix: String,
    interval: Duration,
}

impl<S: DeviceSource> RefreshScheduler<S> {
    /// Create a scheduler that installs into `store`.
    pub fn new(
        source: S,
        store: RegistryStore,
        alias_tag_prefix: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            alias_tag_prefix: alias_tag_prefix.into(),
            interval,
        }
    }

    /// Run one fetch/build/install cycle.
    ///
    /// On error nothing is installed and the active registry is untouched.
    /// Returns the generation of the installed registry.
    pub async fn refresh(&self) -> Result<u64, DnsError> {
        let timer = Timer::start();

        let devices = match self.source.fetch_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                metrics::record_refresh(RefreshResult::Error, timer.elapsed());
                return Err(e);
            }
        };

        if devices.is_empty() {
            warn!("device directory returned no devices, installing empty registry");
        }

        let registry = Registry::build(&devices, &self.alias_tag_prefix);
        let (hosts, aliases) = (registry.hosts_count(), registry.aliases_count());
        let generation = self.store.install(registry);

        metrics::record_refresh(RefreshResult::Success, timer.elapsed());
        metrics::record_registry_installed(hosts, aliases, generation);

        info!(
            devices = devices.len(),
            hosts,
            aliases,
            generation,
            "installed registry"
        );
        Ok(generation)
    }

    /// Refresh every interval until cancelled.
    ///
    /// The first refresh happens one interval from now; the startup
    /// refresh is the caller's job. Failures are logged and the next tick
    /// is the retry.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("refresh loop shutting down");
                    return;
                }

                _ = ticker.tick() => {
                    // an in-flight fetch must not hold up shutdown
                    tokio::select! {
                        biased;

                        _ = shutdown.cancelled() => {
                            debug!("refresh loop shutting down mid-refresh");
                            return;
                        }

                        result = self.refresh() => {
                            if let Err(e) = result {
                                error!(
                                    error = %e,
                                    generation = self.store.generation(),
                                    "registry refresh failed, keeping previous registry"
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}
