//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (startup and change events):
//!     ModuleBootstrapDiscovery[]
//!     → table.rs (literal prefix → ordered RoutingEntry buckets)
//!     → registry.rs (atomic swap of ingress / egress snapshot)
//!
//! Incoming Request (method, path, headers)
//!     → path.rs (module-name prefix strategy, ingress only)
//!     → resolver.rs (ingress → egress → dynamic → gateway)
//!     → table.rs (probe prefix keys from longest to "/")
//!     → matcher.rs (pattern with {param} and * wildcards)
//!     → Return: one RoutingEntry or no match
//! ```
//!
//! # Design Decisions
//! - Tables are immutable once published; updates replace them wholesale
//! - Readers never lock; they hold an `Arc` to one snapshot per request
//! - Deterministic: declaration order breaks ties within a prefix bucket
//! - Wildcard backtracking is bounded per match

pub mod entry;
pub mod matcher;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod table;

pub use entry::{RouteDirection, RoutingEntry};
pub use matcher::PatternMatcher;
pub use path::{PathPrefixStrategy, PathProcessor};
pub use registry::RouteRegistry;
pub use resolver::{ResolveError, ResolvedRoute, RouteResolver, RouteResolvers};
pub use table::{RouteTable, RouteTableError};
