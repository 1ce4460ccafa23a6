//! Transaction timing.
//!
//! One record per forwarded request: time until the upstream started
//! reading the request body (connect), until response headers arrived,
//! and until the response body finished streaming.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::routing::entry::RouteDirection;

/// A point in time recorded at most once, from any task.
#[derive(Debug, Clone, Default)]
pub struct Milestone(Arc<OnceLock<Instant>>);

impl Milestone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        let _ = self.0.set(Instant::now());
    }

    pub fn get(&self) -> Option<Instant> {
        self.0.get().copied()
    }
}

/// Timing of one exchange, started before the upstream call.
#[derive(Debug, Clone)]
pub struct TransactionTimer {
    started: Instant,
    connected: Milestone,
}

impl TransactionTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            connected: Milestone::new(),
        }
    }

    /// Marked when the upstream first pulls the request body.
    pub fn connected(&self) -> Milestone {
        self.connected.clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Freeze the header phase. Without a request body the connect time
    /// falls back to the header time.
    pub fn headers_received(&self) -> Timings {
        let now = Instant::now();
        let headers = now - self.started;
        let connect = self
            .connected
            .get()
            .map_or(headers, |at| at.saturating_duration_since(self.started));
        Timings {
            started: self.started,
            connect,
            headers,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Timings {
    started: Instant,
    pub connect: Duration,
    pub headers: Duration,
}

impl Timings {
    pub fn total(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Fields of the `transaction` log record.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub direction: RouteDirection,
    pub method: String,
    pub path: String,
    pub module_id: String,
    pub request_id: String,
    pub status: u16,
}

impl TransactionRecord {
    pub fn emit(&self, connect: Duration, headers: Duration, total: Duration, outcome: &str) {
        tracing::info!(
            target: "transaction",
            direction = %self.direction,
            method = %self.method,
            path = %self.path,
            status = self.status,
            module_id = %self.module_id,
            request_id = %self.request_id,
            connect_ms = connect.as_millis() as u64,
            headers_ms = headers.as_millis() as u64,
            total_ms = total.as_millis() as u64,
            outcome = outcome,
            "Transaction"
        );
        metrics::record_request(self.direction, &self.method, self.status, total);
    }

    /// Record for an exchange that never produced response headers.
    pub fn emit_failure(&self, timer: &TransactionTimer, outcome: &str) {
        let total = timer.elapsed();
        let connect = timer
            .connected
            .get()
            .map_or(total, |at| at.saturating_duration_since(timer.started));
        self.emit(connect, total, total, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestone_is_set_once() {
        let milestone = Milestone::new();
        milestone.mark();
        let first = milestone.get().unwrap();
        std::thread::sleep(Duration::from_millis(2));
        milestone.clone().mark();
        assert_eq!(milestone.get(), Some(first));
    }

    #[test]
    fn test_connect_falls_back_to_headers() {
        let timer = TransactionTimer::start();
        std::thread::sleep(Duration::from_millis(2));
        let timings = timer.headers_received();
        assert_eq!(timings.connect, timings.headers);
        assert!(timings.total() >= timings.headers);
    }

    #[test]
    fn test_connect_before_headers() {
        let timer = TransactionTimer::start();
        timer.connected().mark();
        std::thread::sleep(Duration::from_millis(2));
        let timings = timer.headers_received();
        assert!(timings.connect < timings.headers);
    }
}
