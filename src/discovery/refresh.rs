//! Route refresh on control-plane change events.
//!
//! # Responsibilities
//! - Receive change notifications from an external notifier
//! - Optionally refresh on a fixed interval
//! - Re-fetch the bootstrap and rebuild the affected table
//!
//! # Design Decisions
//! - A failed refresh is logged; the current table keeps serving
//! - Events arriving while a refresh runs are coalesced by the channel

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Interval};

use crate::discovery::client::DiscoverySource;
use crate::resilience::retries::{retry_with_backoff, RetryPolicy};
use crate::routing::registry::RouteRegistry;

/// Capacity of the notification channel.
const EVENT_QUEUE: usize = 16;

/// What changed in the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshEvent {
    /// The local module's interfaces changed (ingress).
    ModuleChanged,
    /// The set or shape of dependencies changed (egress).
    DependenciesChanged,
    /// Rebuild both tables.
    Full,
}

/// Background task keeping the route tables current.
pub struct RouteRefresher {
    registry: Arc<RouteRegistry>,
    source: Arc<dyn DiscoverySource>,
    module_id: String,
    retry: RetryPolicy,
    interval: Option<Duration>,
    events: mpsc::Receiver<RefreshEvent>,
}

impl RouteRefresher {
    /// Create the refresher and the sender used by external notifiers.
    pub fn new(
        registry: Arc<RouteRegistry>,
        source: Arc<dyn DiscoverySource>,
        module_id: impl Into<String>,
        retry: RetryPolicy,
        interval: Option<Duration>,
    ) -> (Self, mpsc::Sender<RefreshEvent>) {
        let (tx, events) = mpsc::channel(EVENT_QUEUE);
        let refresher = Self {
            registry,
            source,
            module_id: module_id.into(),
            retry,
            interval: interval.filter(|i| !i.is_zero()),
            events,
        };
        (refresher, tx)
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            module_id = %self.module_id,
            interval = ?self.interval,
            "Route refresher starting"
        );

        let mut ticker = self.interval.map(|period| {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        self.refresh(event).await;
                    }
                    None => {
                        tracing::info!("Refresh channel closed, route refresher exiting");
                        break;
                    }
                },
                _ = next_tick(&mut ticker) => {
                    self.refresh(RefreshEvent::Full).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Route refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Fetch the bootstrap and rebuild the tables named by `event`.
    ///
    /// Returns true if a table was replaced.
    pub async fn refresh(&self, event: RefreshEvent) -> bool {
        let fetched = retry_with_backoff(&self.retry, "module bootstrap refresh", || {
            self.source.fetch_bootstrap(&self.module_id)
        })
        .await;

        let bootstrap = match fetched {
            Ok(bootstrap) => bootstrap,
            Err(e) => {
                tracing::error!(event = ?event, error = %e, "Route refresh failed, keeping current routes");
                return false;
            }
        };

        let updated = match event {
            RefreshEvent::ModuleChanged => self.registry.update_ingress_routes(&bootstrap.module),
            RefreshEvent::DependenciesChanged => self.registry.update_egress_routes(&bootstrap.required_modules),
            RefreshEvent::Full => self.registry.bootstrap_module(&bootstrap),
        };
        updated.is_ok()
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
