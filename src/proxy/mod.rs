//! Forward proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved request (destination URL, direction)
//!     → headers.rs (drop hop-by-hop, user-agent, host, signature)
//!     → forward.rs (correlation id, signature on egress, timeout)
//!     → pump.rs (request body, bounded queue) → upstream
//!     ← pump.rs (response body, bounded queue) ← upstream
//!     → timing.rs (one `transaction` record when the response ends)
//! ```
//!
//! # Design Decisions
//! - Bodies are streamed frame by frame; memory per exchange is bounded
//!   by the configured queue size
//! - No automatic retries on the forward path
//! - The per-call timeout bounds the wait for response headers and every
//!   later body read; a stalled body fails instead of hanging

pub mod forward;
pub mod headers;
pub mod pump;
pub mod timing;

pub use forward::{ForwardError, ForwardOptions, ForwardProxy};
pub use pump::{BodyPump, PumpOutcome, PumpedBody};
