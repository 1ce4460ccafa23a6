//! OS signal handling.
//!
//! # Responsibilities
//! - Turn SIGHUP into a full route refresh
//! - Stop relaying once shutdown is broadcast
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP rebuilds routes, it never shuts down
//! - On platforms without SIGHUP only the periodic tick refreshes

use futures_util::{Stream, StreamExt};
use tokio::sync::{broadcast, mpsc};

use crate::discovery::RefreshEvent;

/// Send `RefreshEvent::Full` to `events` on every SIGHUP.
pub fn refresh_on_sighup(events: mpsc::Sender<RefreshEvent>, shutdown: broadcast::Receiver<()>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::hangup()) {
            Ok(hangup) => {
                let signals = futures_util::stream::unfold(hangup, |mut hangup| async move {
                    hangup.recv().await.map(|()| ((), hangup))
                });
                tokio::spawn(relay_refresh_requests(Box::pin(signals), events, shutdown));
            }
            Err(e) => tracing::warn!(error = %e, "Failed to listen for SIGHUP, refresh on signal disabled"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (events, shutdown);
    }
}

/// Forward each item of `signals` as a full refresh until shutdown, the
/// signal stream ends, or the refresher is gone.
pub async fn relay_refresh_requests<S>(
    mut signals: S,
    events: mpsc::Sender<RefreshEvent>,
    mut shutdown: broadcast::Receiver<()>,
) where
    S: Stream<Item = ()> + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            signal = signals.next() => {
                if signal.is_none() {
                    return;
                }
                tracing::info!("Reload signal received, refreshing routes");
                if events.send(RefreshEvent::Full).await.is_err() {
                    tracing::warn!("Route refresher stopped, ignoring reload signal");
                    return;
                }
            }
        }
    }
}
