//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sidecar.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::routing::path::PathPrefixStrategy;

/// Root configuration for the sidecar.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SidecarConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The module this sidecar fronts.
    pub module: ModuleConfig,

    /// Control-plane connection used for route discovery.
    pub control_plane: ControlPlaneConfig,

    /// Route resolution settings.
    pub routing: RoutingConfig,

    /// Upstream forwarding settings.
    pub proxy: ProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
        }
    }
}

/// The module behind this sidecar.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Full module id including version (e.g., "mod-foo-1.0.0").
    pub id: String,

    /// Module name used as the path prefix (e.g., "mod-foo").
    pub name: String,

    /// Base URL of the module process.
    pub url: String,

    /// How the module-name prefix is applied to ingress paths.
    pub path_prefix_strategy: PathPrefixStrategy,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            url: "http://localhost:8080".to_string(),
            path_prefix_strategy: PathPrefixStrategy::None,
        }
    }
}

/// Control-plane connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Base URL of the discovery service.
    pub url: String,

    /// Timeout for a single control-plane call in seconds.
    pub request_timeout_secs: u64,

    /// Periodic route refresh interval in seconds (0 = only on events).
    pub refresh_interval_secs: u64,

    /// Retry policy for bootstrap fetches.
    pub bootstrap_retry: BootstrapRetryConfig,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9130".to_string(),
            request_timeout_secs: 10,
            refresh_interval_secs: 0,
            bootstrap_retry: BootstrapRetryConfig::default(),
        }
    }
}

/// Exponential backoff settings for discovery bootstrap.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BootstrapRetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,

    /// Upper bound on the whole retry sequence in seconds.
    pub max_elapsed_secs: u64,
}

impl Default for BootstrapRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            max_elapsed_secs: 300,
        }
    }
}

/// Route resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Forward egress requests without a route to the gateway.
    pub forward_unknown_requests: bool,

    /// Catch-all destination for unknown egress requests.
    pub gateway_url: Option<String>,

    /// Resolve egress routes by module hint through the control plane.
    pub dynamic_discovery_enabled: bool,

    /// Bounds for the dynamic discovery cache.
    pub discovery_cache: DiscoveryCacheConfig,

    /// Tenant → entitled module ids, used to resolve module-name hints.
    pub entitlements: HashMap<String, Vec<String>>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            forward_unknown_requests: false,
            gateway_url: None,
            dynamic_discovery_enabled: false,
            discovery_cache: DiscoveryCacheConfig::default(),
            entitlements: HashMap::new(),
        }
    }
}

/// Discovery cache sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryCacheConfig {
    /// Maximum number of cached module tables.
    pub max_entries: usize,

    /// Time-to-live of a cached entry in seconds.
    pub ttl_secs: u64,
}

impl Default for DiscoveryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 250,
            ttl_secs: 300,
        }
    }
}

/// Upstream forwarding settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Per-call timeout until upstream response headers arrive, in milliseconds.
    pub request_timeout_ms: u64,

    /// Body frames buffered between reader and writer before reading pauses.
    pub write_queue_frames: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 60_000,
            write_queue_frames: 8,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
