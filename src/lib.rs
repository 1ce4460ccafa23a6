//! Per-module sidecar: routes ingress and egress calls of one backend
//! module using route tables discovered from the control plane.

pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::SidecarConfig;
pub use http::SidecarServer;
pub use lifecycle::Shutdown;
