//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Control-plane bootstrap fetch:
//!     → retries.rs (retry with backoff.rs delays, bounded attempts/time)
//!
//! Upstream forward call:
//!     → timeouts.rs (deadline; expiry reported apart from failure)
//!     → never retried
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Retries only for discovery reads, which are idempotent

pub mod backoff;
pub mod retries;
pub mod timeouts;
