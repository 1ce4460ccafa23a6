//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Egress forward:
//!     → signature.rs (attach process signature)
//!
//! Ingress request:
//!     → signature.rs (flag self-requests, strip before forwarding)
//! ```
//!
//! # Design Decisions
//! - Token validation and authorization policy live outside the sidecar core
//! - The signature is the only process-wide state and is immutable

pub mod signature;

pub use signature::{SidecarSignature, SIGNATURE_HEADER};
