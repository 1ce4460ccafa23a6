//! Routing entries: one resolved (module, interface, endpoint) triple.

use std::fmt;

use axum::http::Uri;
use serde::Serialize;

use crate::discovery::types::{EndpointDescriptor, InterfaceType};
use crate::routing::matcher::PatternMatcher;

/// Module id carried by synthesized gateway entries without a hint.
pub const GATEWAY_MODULE_ID: &str = "gateway";

/// Parse an upstream URL. Only absolute `http://` URLs with a host are accepted.
///
/// Route tables and the forwarder share this check, so a location that
/// compiles into a table is one the forwarder can dial.
pub fn parse_location(location: &str) -> Result<Uri, String> {
    let uri: Uri = location.parse().map_err(|e| format!("{e}"))?;
    match uri.scheme_str() {
        Some("http") if uri.authority().is_some_and(|a| !a.host().is_empty()) => Ok(uri),
        Some("http") => Err("missing host".to_string()),
        Some(other) => Err(format!("unsupported scheme '{other}'")),
        None => Err("not an absolute URL".to_string()),
    }
}

/// Which side of the sidecar a request travels through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteDirection {
    /// Platform → local module.
    Ingress,
    /// Local module → peer module.
    Egress,
}

impl RouteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDirection::Ingress => "ingress",
            RouteDirection::Egress => "egress",
        }
    }
}

impl fmt::Display for RouteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route usable to forward a specific request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RoutingEntry {
    pub module_id: String,
    /// Upstream base URL; `None` when the module cannot be reached yet.
    pub location: Option<String>,
    pub interface_id: String,
    pub interface_type: InterfaceType,
    pub endpoint: EndpointDescriptor,
}

impl RoutingEntry {
    /// Catch-all entry pointing at the gateway.
    pub fn gateway(location: &str, module_hint: Option<&str>) -> Self {
        Self {
            module_id: module_hint.unwrap_or(GATEWAY_MODULE_ID).to_string(),
            location: Some(location.to_string()),
            interface_id: GATEWAY_MODULE_ID.to_string(),
            interface_type: InterfaceType::Regular,
            endpoint: EndpointDescriptor {
                path_pattern: Some("/*".to_string()),
                methods: vec!["*".to_string()],
                ..Default::default()
            },
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.interface_type == InterfaceType::Multiple
    }

    /// Checks method, path and, for shared interfaces, the module hint.
    pub fn matches(
        &self,
        matcher: &PatternMatcher,
        method: &str,
        path: &str,
        module_hint: Option<&str>,
    ) -> bool {
        if !self.endpoint.allows_method(method) {
            return false;
        }

        let path_matches = match (&self.endpoint.path_pattern, &self.endpoint.path) {
            (Some(pattern), _) => matcher.matches(pattern, path),
            (None, Some(literal)) => path.starts_with(literal.as_str()),
            (None, None) => false,
        };

        path_matches && (!self.is_multiple() || module_hint == Some(self.module_id.as_str()))
    }
}
