//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Bootstrap routes (retried) → Build dispatcher
//!     → Spawn refresher → Start listener
//!
//! Reload (signals.rs):
//!     SIGHUP → RefreshEvent::Full → refresher rebuilds both tables
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → server drains, refresher and signal relay exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then listeners
//! - Exhausting bootstrap retries is fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{bootstrap_routes, build_dispatcher, start, Sidecar, StartupError};
