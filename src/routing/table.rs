//! Immutable route table snapshots.
//!
//! # Responsibilities
//! - Compile discovery documents into prefix buckets of routing entries
//! - Reject malformed discovery input before anything is published
//! - Look up the first matching entry, probing the longest prefix first
//!
//! # Design Decisions
//! - A table is never mutated after `build()`; updates build a new one
//! - Bucket order follows declaration order (module, then endpoint)
//! - Structurally equal entries in one bucket are deduplicated

use std::collections::HashMap;

use thiserror::Error;

use crate::discovery::types::{EndpointDescriptor, ModuleBootstrapDiscovery};
use crate::routing::entry::{parse_location, RoutingEntry};
use crate::routing::matcher::PatternMatcher;

/// Discovery input that cannot be compiled into routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    #[error("Invalid module configuration for '{module_id}': {reason}")]
    InvalidModuleConfig { module_id: String, reason: String },
}

impl RouteTableError {
    fn invalid(module_id: &str, reason: impl Into<String>) -> Self {
        RouteTableError::InvalidModuleConfig {
            module_id: module_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn module_id(&self) -> &str {
        match self {
            RouteTableError::InvalidModuleConfig { module_id, .. } => module_id,
        }
    }
}

/// Literal prefix → ordered routing entries.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: HashMap<String, Vec<RoutingEntry>>,
    entry_count: usize,
    matcher: PatternMatcher,
}

impl RouteTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Compile a single module. `location` overrides the discovered location.
    pub fn from_discovery(
        discovery: &ModuleBootstrapDiscovery,
        location: Option<&str>,
    ) -> Result<Self, RouteTableError> {
        let mut builder = Self::builder();
        builder.add_module(discovery, location)?;
        Ok(builder.build())
    }

    /// Compile several modules into one table, preserving module order.
    pub fn from_discoveries(
        discoveries: &[ModuleBootstrapDiscovery],
    ) -> Result<Self, RouteTableError> {
        let mut builder = Self::builder();
        for discovery in discoveries {
            builder.add_module(discovery, None)?;
        }
        Ok(builder.build())
    }

    /// Find the first entry matching the request, longest prefix first.
    pub fn lookup(&self, method: &str, path: &str, module_hint: Option<&str>) -> Option<&RoutingEntry> {
        let mut key = Some(path);
        while let Some(current) = key {
            if let Some(entries) = self.routes.get(current) {
                let found = entries
                    .iter()
                    .find(|entry| entry.matches(&self.matcher, method, path, module_hint));
                if found.is_some() {
                    return found;
                }
            }
            key = parent_key(current);
        }
        None
    }

    /// Entries registered under an exact prefix.
    pub fn bucket(&self, prefix: &str) -> Option<&[RoutingEntry]> {
        self.routes.get(prefix).map(Vec::as_slice)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Total number of entries across all buckets.
    pub fn len(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Accumulates modules for a new table; discarded on error.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: HashMap<String, Vec<RoutingEntry>>,
    entry_count: usize,
    matcher: PatternMatcher,
}

impl RouteTableBuilder {
    pub fn with_matcher(mut self, matcher: PatternMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Validate and append all endpoints of one module.
    ///
    /// The module is checked in full before any entry is added, so a failed
    /// call leaves the builder unchanged.
    pub fn add_module(
        &mut self,
        discovery: &ModuleBootstrapDiscovery,
        location: Option<&str>,
    ) -> Result<&mut Self, RouteTableError> {
        let module_id = discovery.module_id.trim();
        if module_id.is_empty() {
            return Err(RouteTableError::invalid("<blank>", "module id must not be blank"));
        }

        let location = location
            .map(str::to_string)
            .or_else(|| discovery.location.clone());
        if let Some(location) = &location {
            parse_location(location)
                .map_err(|e| RouteTableError::invalid(module_id, format!("invalid location '{location}': {e}")))?;
        }

        let mut pending = Vec::new();
        for interface in &discovery.interfaces {
            if interface.id.trim().is_empty() {
                return Err(RouteTableError::invalid(module_id, "interface id must not be blank"));
            }
            for endpoint in &interface.endpoints {
                let prefix = endpoint_prefix(endpoint).ok_or_else(|| {
                    RouteTableError::invalid(
                        module_id,
                        format!("endpoint of interface '{}' has no usable path", interface.id),
                    )
                })?;
                if endpoint.methods.is_empty() {
                    return Err(RouteTableError::invalid(
                        module_id,
                        format!("endpoint '{prefix}' of interface '{}' declares no methods", interface.id),
                    ));
                }
                pending.push((
                    prefix,
                    RoutingEntry {
                        module_id: module_id.to_string(),
                        location: location.clone(),
                        interface_id: interface.id.clone(),
                        interface_type: interface.interface_type,
                        endpoint: endpoint.clone(),
                    },
                ));
            }
        }

        for (prefix, entry) in pending {
            let bucket = self.routes.entry(prefix).or_default();
            if !bucket.contains(&entry) {
                bucket.push(entry);
                self.entry_count += 1;
            }
        }
        Ok(self)
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            routes: self.routes,
            entry_count: self.entry_count,
            matcher: self.matcher,
        }
    }
}

/// Bucket key for an endpoint: pattern prefix, or the literal path itself.
fn endpoint_prefix(endpoint: &EndpointDescriptor) -> Option<String> {
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| v.starts_with('/'))
            .map(str::to_string)
    };
    non_blank(&endpoint.path_pattern)
        .map(|pattern| route_prefix(&pattern).to_string())
        .or_else(|| non_blank(&endpoint.path))
}

/// Literal part of a pattern before its first `{` or `*`, cut back to the
/// preceding `/`. Patterns without placeholders are their own prefix.
pub fn route_prefix(pattern: &str) -> &str {
    match pattern.find(['{', '*']) {
        None => pattern,
        Some(wildcard) => match pattern[..wildcard].rfind('/') {
            Some(0) | None => "/",
            Some(slash) => &pattern[..slash],
        },
    }
}

/// Next key to probe: the path with its last segment dropped.
fn parent_key(key: &str) -> Option<&str> {
    if key.is_empty() || key == "/" {
        return None;
    }
    match key.rfind('/') {
        Some(0) => Some("/"),
        Some(slash) => Some(&key[..slash]),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::types::{InterfaceDescriptor, InterfaceType};

    fn endpoint(pattern: &str, methods: &[&str]) -> EndpointDescriptor {
        EndpointDescriptor {
            path_pattern: Some(pattern.to_string()),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    fn module(id: &str, interface: &str, endpoints: Vec<EndpointDescriptor>) -> ModuleBootstrapDiscovery {
        ModuleBootstrapDiscovery {
            module_id: id.to_string(),
            location: Some(format!("http://{id}:8081")),
            interfaces: vec![InterfaceDescriptor {
                id: interface.to_string(),
                interface_type: InterfaceType::Regular,
                endpoints,
            }],
        }
    }

    #[test]
    fn test_route_prefix() {
        assert_eq!(route_prefix("/foo/entities"), "/foo/entities");
        assert_eq!(route_prefix("/foo/entities/{id}"), "/foo/entities");
        assert_eq!(route_prefix("/foo/ent*"), "/foo");
        assert_eq!(route_prefix("/foo/{id}/items"), "/foo");
        assert_eq!(route_prefix("/*"), "/");
        assert_eq!(route_prefix("/{id}"), "/");
    }

    #[test]
    fn test_parent_key() {
        assert_eq!(parent_key("/a/b/c"), Some("/a/b"));
        assert_eq!(parent_key("/a"), Some("/"));
        assert_eq!(parent_key("/a/"), Some("/a"));
        assert_eq!(parent_key("/"), None);
        assert_eq!(parent_key(""), None);
    }

    #[test]
    fn test_scenario_entities() {
        let table = RouteTable::from_discovery(
            &module(
                "mod-foo-1.0.0",
                "foo",
                vec![
                    endpoint("/foo/entities", &["GET", "POST"]),
                    endpoint("/foo/entities/{id}", &["GET"]),
                ],
            ),
            None,
        )
        .unwrap();

        let found = table.lookup("GET", "/foo/entities/abc123", None).unwrap();
        assert_eq!(found.endpoint.path_pattern.as_deref(), Some("/foo/entities/{id}"));

        let found = table.lookup("POST", "/foo/entities", None).unwrap();
        assert_eq!(found.endpoint.path_pattern.as_deref(), Some("/foo/entities"));

        assert!(table.lookup("DELETE", "/foo/entities", None).is_none());
        assert!(table.lookup("GET", "/bar/entities", None).is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_longest_prefix_probed_first() {
        let table = RouteTable::from_discoveries(&[
            module("mod-a-1.0.0", "a", vec![endpoint("/a/*", &["*"])]),
            module("mod-ab-1.0.0", "ab", vec![endpoint("/a/b/*", &["*"])]),
        ])
        .unwrap();

        assert!(table.bucket("/a").is_some());
        assert!(table.bucket("/a/b").is_some());
        assert_eq!(table.lookup("GET", "/a/b/c", None).unwrap().module_id, "mod-ab-1.0.0");
        assert_eq!(table.lookup("GET", "/a/x/c", None).unwrap().module_id, "mod-a-1.0.0");
    }

    #[test]
    fn test_root_wildcard() {
        let table = RouteTable::from_discovery(
            &module("mod-any-1.0.0", "any", vec![endpoint("/*", &["GET"])]),
            None,
        )
        .unwrap();
        assert!(table.lookup("GET", "/deep/nested/path", None).is_some());
        assert!(table.lookup("GET", "/", None).is_some());
    }

    #[test]
    fn test_literal_path_fallback() {
        let mut discovery = module("mod-foo-1.0.0", "foo", vec![]);
        discovery.interfaces[0].endpoints.push(EndpointDescriptor {
            path: Some("/foo/legacy".into()),
            methods: vec!["GET".into()],
            ..Default::default()
        });
        let table = RouteTable::from_discovery(&discovery, None).unwrap();
        assert!(table.bucket("/foo/legacy").is_some());
        assert!(table.lookup("GET", "/foo/legacy/42", None).is_some());
        assert!(table.lookup("GET", "/foo", None).is_none());
    }

    #[test]
    fn test_bucket_order_and_dedup() {
        let first = module("mod-a-1.0.0", "shared", vec![endpoint("/x/{id}", &["GET"])]);
        let second = module("mod-b-1.0.0", "shared", vec![endpoint("/x/{id}", &["GET"])]);
        let table = RouteTable::from_discoveries(&[first.clone(), second, first]).unwrap();

        let bucket = table.bucket("/x").unwrap();
        let ids: Vec<_> = bucket.iter().map(|e| e.module_id.as_str()).collect();
        assert_eq!(ids, vec!["mod-a-1.0.0", "mod-b-1.0.0"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_location_override() {
        let table = RouteTable::from_discovery(
            &module("mod-foo-1.0.0", "foo", vec![endpoint("/foo", &["GET"])]),
            Some("http://localhost:8080"),
        )
        .unwrap();
        let entry = table.lookup("GET", "/foo", None).unwrap();
        assert_eq!(entry.location.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_invalid_modules_rejected() {
        let blank = module("  ", "foo", vec![endpoint("/foo", &["GET"])]);
        assert!(RouteTable::from_discovery(&blank, None).is_err());

        let no_methods = module("mod-foo-1.0.0", "foo", vec![endpoint("/foo", &[])]);
        let err = RouteTable::from_discovery(&no_methods, None).unwrap_err();
        assert_eq!(err.module_id(), "mod-foo-1.0.0");

        let no_path = module("mod-foo-1.0.0", "foo", vec![EndpointDescriptor {
            methods: vec!["GET".into()],
            ..Default::default()
        }]);
        assert!(RouteTable::from_discovery(&no_path, None).is_err());

        let mut bad_location = module("mod-foo-1.0.0", "foo", vec![endpoint("/foo", &["GET"])]);
        bad_location.location = Some("not a url".into());
        assert!(RouteTable::from_discovery(&bad_location, None).is_err());
    }

    #[test]
    fn test_location_checked_like_forwarder() {
        let versioned = module("mod-foo-1.0.0", "foo", vec![endpoint("/foo", &["GET"])]);
        let table = RouteTable::from_discovery(&versioned, None).unwrap();
        assert_eq!(
            table.lookup("GET", "/foo", None).unwrap().location.as_deref(),
            Some("http://mod-foo-1.0.0:8081")
        );

        let mut tls = versioned.clone();
        tls.location = Some("https://mod-foo:8443".into());
        let err = RouteTable::from_discovery(&tls, None).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"), "{err}");
    }

    #[test]
    fn test_failed_module_leaves_builder_unchanged() {
        let mut builder = RouteTable::builder();
        builder
            .add_module(&module("mod-a-1.0.0", "a", vec![endpoint("/a", &["GET"])]), None)
            .unwrap();
        let broken = module(
            "mod-b-1.0.0",
            "b",
            vec![endpoint("/b", &["GET"]), endpoint("/b/c", &[])],
        );
        assert!(builder.add_module(&broken, None).is_err());

        let table = builder.build();
        assert_eq!(table.len(), 1);
        assert!(table.bucket("/b").is_none());
    }

    #[test]
    fn test_missing_location_is_kept_as_none() {
        let mut discovery = module("mod-foo-1.0.0", "foo", vec![endpoint("/foo", &["GET"])]);
        discovery.location = None;
        let table = RouteTable::from_discoveries(&[discovery]).unwrap();
        assert_eq!(table.lookup("GET", "/foo", None).unwrap().location, None);
    }
}
