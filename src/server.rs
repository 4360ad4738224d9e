//! DNS server setup and lifecycle management.

use hickory_server::authority::{AuthorityObject, Catalog};
use hickory_server::ServerFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::authority::TailnetAuthority;
use crate::config::{DirectoryConfig, DnsConfig};
use crate::directory::{DeviceSource, DirectoryClient};
use crate::error::DnsError;
use crate::metrics;
use crate::refresh::RefreshScheduler;
use crate::registry::RegistryStore;

/// Interval for emitting registry metrics.
const METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// Periodically emit registry metrics.
async fn metrics_loop(store: RegistryStore, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(METRICS_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let registry = store.snapshot();
                let age = registry.built_at().elapsed();
                metrics::record_registry_counts(registry.hosts_count(), registry.aliases_count());
                metrics::record_generation(store.generation());
                metrics::record_registry_age(age);
                debug!(
                    names = registry.len(),
                    generation = store.generation(),
                    age_secs = age.as_secs(),
                    "emitted registry metrics"
                );
            }
            _ = shutdown.cancelled() => {
                debug!("metrics loop shutting down");
                return;
            }
        }
    }
}

/// Build the request handler serving `config.domain` from `store`.
pub fn build_catalog(config: DnsConfig, store: RegistryStore) -> Result<Catalog, DnsError> {
    let authority = TailnetAuthority::new(config, store)?;
    let origin = authority.origin().clone();
    let authority: Arc<dyn AuthorityObject> = Arc::new(authority);

    let mut catalog = Catalog::new();
    catalog.upsert(origin, vec![authority]);
    Ok(catalog)
}

/// DNS server backed by the tailnet device directory.
pub struct DnsServer {
    dns: DnsConfig,
    directory: DirectoryConfig,
    store: RegistryStore,
}

impl DnsServer {
    /// Create a new DNS server with the given configuration.
    pub fn new(dns: DnsConfig, directory: DirectoryConfig) -> Self {
        Self {
            dns,
            directory,
            store: RegistryStore::new(),
        }
    }

    /// Get a handle to the registry store.
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Run the DNS server against the configured directory until `shutdown`
    /// is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), DnsError> {
        let client = DirectoryClient::new(&self.directory)?;
        info!(url = %client.url(), "using device directory");
        self.run_with_source(client, shutdown).await
    }

    /// Run the DNS server with an explicit device source.
    ///
    /// The first refresh happens before any socket is bound; if it fails the
    /// error is returned and nothing is served. Bind errors are returned the
    /// same way, before any background task is started.
    pub async fn run_with_source<S>(
        self,
        source: S,
        shutdown: CancellationToken,
    ) -> Result<(), DnsError>
    where
        S: DeviceSource + 'static,
    {
        info!(
            listen_addr = %self.dns.listen_addr,
            domain = %self.dns.domain,
            tailnet = %self.directory.tailnet,
            refresh_interval_secs = self.directory.refresh_interval,
            "Starting tailnet-dns server"
        );

        let scheduler = RefreshScheduler::new(
            source,
            self.store.clone(),
            self.directory.alias_tag_prefix.clone(),
            self.directory.refresh_interval(),
        );

        info!("Loading devices from directory...");
        if let Err(e) = scheduler.refresh().await {
            error!(error = %e, "initial device load failed");
            return Err(e);
        }

        let catalog = build_catalog(self.dns.clone(), self.store.clone())?;
        let mut server = ServerFuture::new(catalog);

        // Bind UDP
        let udp_socket = UdpSocket::bind(self.dns.listen_addr).await?;
        info!(addr = %self.dns.listen_addr, "DNS UDP listening");
        server.register_socket(udp_socket);

        // Bind TCP
        let tcp_listener = TcpListener::bind(self.dns.listen_addr).await?;
        info!(addr = %self.dns.listen_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, Duration::from_secs(30));

        info!(domain = %self.dns.domain, "DNS server ready to serve queries");

        // spawned only once both sockets are bound, so a bind error leaves
        // nothing running
        let refresh_handle = tokio::spawn(scheduler.run(shutdown.clone()));

        let metrics_handle = tokio::spawn(metrics_loop(self.store.clone(), shutdown.clone()));

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("DNS server shutdown requested");
            }
            result = server.block_until_done() => {
                if let Err(e) = result {
                    error!("DNS server error: {}", e);
                }
                shutdown.cancel();
            }
        }

        let _ = metrics_handle.await;
        let _ = refresh_handle.await;

        info!("DNS server stopped");
        Ok(())
    }
}
