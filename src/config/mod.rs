//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SidecarConfig (validated, immutable)
//!     → handed to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; routes are the only hot-swapped state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BootstrapRetryConfig, ControlPlaneConfig, DiscoveryCacheConfig, ListenerConfig, LogFormat,
    ModuleConfig, ObservabilityConfig, ProxyConfig, RoutingConfig, SidecarConfig,
};
