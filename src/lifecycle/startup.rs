//! Startup orchestration.
//!
//! # Responsibilities
//! - Fetch the initial module bootstrap (retried with backoff)
//! - Build the registry, resolvers, proxy and dispatcher from config
//! - Hand back the refresher for the caller to spawn
//!
//! # Design Decisions
//! - Fail fast: without an initial route table the sidecar cannot serve
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when routes exist)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::SidecarConfig;
use crate::discovery::cache::DiscoveryCache;
use crate::discovery::client::{DiscoveryError, DiscoverySource};
use crate::discovery::entitlements::EntitlementSource;
use crate::discovery::refresh::{RefreshEvent, RouteRefresher};
use crate::http::dispatcher::Dispatcher;
use crate::proxy::ForwardProxy;
use crate::resilience::retries::{retry_with_backoff, RetryExhausted, RetryPolicy};
use crate::routing::path::PathProcessor;
use crate::routing::registry::RouteRegistry;
use crate::routing::resolver::RouteResolvers;
use crate::routing::table::RouteTableError;
use crate::security::SidecarSignature;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Initial route bootstrap failed: {0}")]
    BootstrapExhausted(#[from] RetryExhausted<DiscoveryError>),

    #[error("Initial bootstrap rejected: {0}")]
    InvalidBootstrap(#[from] RouteTableError),
}

/// A started sidecar, minus the listener.
pub struct Sidecar {
    pub registry: Arc<RouteRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub refresher: RouteRefresher,
    /// Handle for external change notifiers.
    pub refresh_events: mpsc::Sender<RefreshEvent>,
}

/// Fetch the bootstrap and publish both route tables.
pub async fn bootstrap_routes(
    registry: &RouteRegistry,
    source: &dyn DiscoverySource,
    module_id: &str,
    policy: &RetryPolicy,
) -> Result<(), StartupError> {
    let bootstrap = retry_with_backoff(policy, "module bootstrap", || source.fetch_bootstrap(module_id)).await?;
    registry.bootstrap_module(&bootstrap)?;
    Ok(())
}

/// Build the request path from config.
pub fn build_dispatcher(
    config: &SidecarConfig,
    registry: Arc<RouteRegistry>,
    source: Arc<dyn DiscoverySource>,
    entitlements: Arc<dyn EntitlementSource>,
    signature: SidecarSignature,
) -> Dispatcher {
    let path_processor = PathProcessor::new(&config.module.name, config.module.path_prefix_strategy);
    let mut resolvers = RouteResolvers::new(registry, path_processor);

    if config.routing.dynamic_discovery_enabled {
        let cache = Arc::new(DiscoveryCache::new(source, &config.routing.discovery_cache));
        resolvers = resolvers.with_dynamic_discovery(cache, entitlements);
    }
    if config.routing.forward_unknown_requests {
        if let Some(gateway_url) = &config.routing.gateway_url {
            resolvers = resolvers.with_gateway(gateway_url.clone());
        }
    }

    tracing::info!(
        module_id = %config.module.id,
        strategy = ?config.module.path_prefix_strategy,
        resolvers = ?resolvers.chain(),
        "Resolver chain configured"
    );

    let proxy = ForwardProxy::new(&config.proxy, signature.clone());
    Dispatcher::new(resolvers, proxy, signature)
}

/// Bootstrap routes and assemble the sidecar.
pub async fn start(
    config: &SidecarConfig,
    source: Arc<dyn DiscoverySource>,
    entitlements: Arc<dyn EntitlementSource>,
    signature: SidecarSignature,
) -> Result<Sidecar, StartupError> {
    let registry = Arc::new(RouteRegistry::new(config.module.url.clone()));
    let policy = RetryPolicy::from(&config.control_plane.bootstrap_retry);

    bootstrap_routes(&registry, source.as_ref(), &config.module.id, &policy).await?;

    let dispatcher = Arc::new(build_dispatcher(
        config,
        registry.clone(),
        source.clone(),
        entitlements,
        signature,
    ));

    let interval = Duration::from_secs(config.control_plane.refresh_interval_secs);
    let (refresher, refresh_events) = RouteRefresher::new(
        registry.clone(),
        source,
        config.module.id.clone(),
        policy,
        Some(interval),
    );

    Ok(Sidecar {
        registry,
        dispatcher,
        refresher,
        refresh_events,
    })
}
