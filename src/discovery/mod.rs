//! Discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     client.rs (GET bootstrap, retried) → RouteRegistry::bootstrap_module
//!
//! Change event / periodic tick:
//!     refresh.rs → client.rs → RouteRegistry::update_{ingress,egress}_routes
//!
//! Egress request with module hint (dynamic routing):
//!     module_id.rs (id or name?) → entitlements.rs (name → id)
//!     → cache.rs (single in-flight load per module) → compiled RouteTable
//! ```
//!
//! # Design Decisions
//! - Discovery documents are opaque beyond the shape in types.rs
//! - All control-plane I/O is async and bounded by timeouts
//! - Collaborators (control plane, entitlements) sit behind traits

pub mod cache;
pub mod client;
pub mod entitlements;
pub mod module_id;
pub mod refresh;
pub mod types;

pub use cache::DiscoveryCache;
pub use client::{DiscoveryError, DiscoverySource, HttpDiscoverySource};
pub use entitlements::{EntitlementError, EntitlementSource, StaticEntitlements};
pub use refresh::{RefreshEvent, RouteRefresher};
pub use types::{EndpointDescriptor, InterfaceDescriptor, InterfaceType, ModuleBootstrap, ModuleBootstrapDiscovery};
