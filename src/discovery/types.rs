//! Discovery document types received from the control plane.
//!
//! These mirror the JSON shape of the module bootstrap endpoint; field names
//! are camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Kind of HTTP interface a module provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    /// Platform-internal interface (tenant init, timers, ...).
    System,
    /// Interface implemented by several modules; requires a module hint.
    Multiple,
    /// Ordinary interface owned by exactly one module. Unknown kinds land here.
    #[default]
    #[serde(other)]
    Regular,
}

/// One endpoint declaration within an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointDescriptor {
    /// Literal path, used when no pattern is declared.
    pub path: Option<String>,

    /// Path pattern with `{param}` and `*` placeholders.
    pub path_pattern: Option<String>,

    /// Allowed HTTP methods; `"*"` means any.
    pub methods: Vec<String>,

    pub permissions_required: Vec<String>,
    pub permissions_desired: Vec<String>,
    pub module_permissions: Vec<String>,
}

impl EndpointDescriptor {
    /// Returns true if the endpoint accepts the given method.
    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == "*" || m == method)
    }
}

/// An HTTP interface exposed by a module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterfaceDescriptor {
    pub id: String,
    pub interface_type: InterfaceType,
    pub endpoints: Vec<EndpointDescriptor>,
}

/// Discovery information for a single module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleBootstrapDiscovery {
    pub module_id: String,

    /// Base URL of the module's sidecar; absent when not yet deployed.
    pub location: Option<String>,

    pub interfaces: Vec<InterfaceDescriptor>,
}

/// Full bootstrap payload: the local module plus everything it calls.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleBootstrap {
    pub module: ModuleBootstrapDiscovery,
    pub required_modules: Vec<ModuleBootstrapDiscovery>,
}
