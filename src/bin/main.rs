//! tailnet-dns binary entry point.

use clap::Parser;
use std::path::PathBuf;
use tailnet_dns::{telemetry, Config, DnsServer};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Authoritative DNS server for tailnet devices.
#[derive(Parser, Debug)]
#[command(name = "tailnet-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Optional if everything is set
    /// through TAILNET_DNS__* environment variables.
    #[arg(short, long, default_value = "tailnet-dns.toml")]
    config: PathBuf,
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn wait_for_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    let _ = ctrl_c.await;

    info!("shutdown signal received");
    token.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()).required(false))
        .add_source(
            config::Environment::with_prefix("TAILNET_DNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    config.validate()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        domain = %config.dns.domain,
        tailnet = %config.directory.tailnet,
        "Starting tailnet-dns"
    );

    // Setup graceful shutdown
    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    // Run DNS server
    let server = DnsServer::new(config.dns, config.directory);
    let result = server.run(shutdown).await;

    // Shutdown telemetry
    telemetry::shutdown();

    if let Err(e) = result {
        error!("DNS server error: {}", e);
        return Err(e.into());
    }

    info!("tailnet-dns shutdown complete");
    Ok(())
}
