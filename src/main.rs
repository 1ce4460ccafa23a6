//! Module sidecar
//!
//! Sits beside one backend module, routing platform calls into the module
//! (ingress) and the module's calls to its peers (egress).
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                     SIDECAR                      │
//!   Platform / module    │  ┌────────┐   ┌────────────┐   ┌──────────────┐  │
//!   ─────────────────────┼─▶│  http  │──▶│ dispatcher │──▶│   routing    │  │
//!                        │  │ server │   │            │   │  resolvers   │  │
//!                        │  └────────┘   └─────┬──────┘   └──────┬───────┘  │
//!                        │                     │          ingress/egress    │
//!                        │                     ▼          snapshots (swap)  │
//!                        │               ┌────────────┐          ▲         │
//!   ◀────────────────────┼───────────────│   proxy    │──────────┼─────────┼──▶ Module / peer
//!                        │               │ (streamed) │          │         │
//!                        │               └────────────┘   ┌──────┴───────┐ │
//!                        │                                │  discovery   │◀┼─── Control plane
//!                        │                                │  + refresher │ │
//!                        │                                └──────────────┘ │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use module_sidecar::config::load_config;
use module_sidecar::discovery::{HttpDiscoverySource, StaticEntitlements};
use module_sidecar::lifecycle::{self, signals, Shutdown};
use module_sidecar::observability::{logging, metrics};
use module_sidecar::security::SidecarSignature;
use module_sidecar::SidecarServer;

#[derive(Parser, Debug)]
#[command(name = "module-sidecar", version, about = "Routing sidecar for a platform module")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "sidecar.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability);
    tracing::info!(
        module_id = %config.module.id,
        config = %args.config.display(),
        "module-sidecar v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let signature = SidecarSignature::generate();
    let source = Arc::new(HttpDiscoverySource::new(&config.control_plane)?);
    if config.routing.dynamic_discovery_enabled && config.routing.entitlements.is_empty() {
        tracing::warn!("Dynamic discovery enabled without tenant entitlements; only module-id hints resolve");
    }
    let entitlements = Arc::new(StaticEntitlements::from(config.routing.entitlements.clone()));

    let sidecar = match lifecycle::start(&config, source, entitlements, signature).await {
        Ok(sidecar) => sidecar,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();
    signals::refresh_on_sighup(sidecar.refresh_events.clone(), shutdown.subscribe());

    let refresher = tokio::spawn(sidecar.refresher.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    SidecarServer::new(sidecar.dispatcher)
        .run(listener, shutdown.subscribe())
        .await?;

    shutdown.trigger();
    let _ = refresher.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
