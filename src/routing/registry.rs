//! Hot-swappable ingress and egress route tables.
//!
//! # Responsibilities
//! - Hold the current ingress and egress snapshots
//! - Rebuild a table from discovery input and publish it atomically
//! - Keep serving the previous table when the input is rejected
//!
//! # Design Decisions
//! - Readers load an `Arc<RouteTable>` once per request; no reader locks
//! - A snapshot is either fully built from one discovery generation or not
//!   published at all
//! - Ingress entries forward to the local module URL, not the discovered
//!   location (which is this sidecar)

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::discovery::types::{ModuleBootstrap, ModuleBootstrapDiscovery};
use crate::observability::metrics;
use crate::routing::entry::RouteDirection;
use crate::routing::table::{RouteTable, RouteTableError};

/// Owner of the published route snapshots.
#[derive(Debug)]
pub struct RouteRegistry {
    ingress: ArcSwap<RouteTable>,
    egress: ArcSwap<RouteTable>,
    module_url: Option<String>,
}

impl RouteRegistry {
    /// Create a registry with empty tables. Ingress entries will point at `module_url`.
    pub fn new(module_url: impl Into<String>) -> Self {
        Self {
            ingress: ArcSwap::from_pointee(RouteTable::empty()),
            egress: ArcSwap::from_pointee(RouteTable::empty()),
            module_url: Some(module_url.into()),
        }
    }

    /// Registry that keeps the discovered location for ingress entries.
    pub fn with_discovered_locations() -> Self {
        Self {
            ingress: ArcSwap::from_pointee(RouteTable::empty()),
            egress: ArcSwap::from_pointee(RouteTable::empty()),
            module_url: None,
        }
    }

    /// Current ingress snapshot.
    pub fn ingress(&self) -> Arc<RouteTable> {
        self.ingress.load_full()
    }

    /// Current egress snapshot.
    pub fn egress(&self) -> Arc<RouteTable> {
        self.egress.load_full()
    }

    pub fn snapshot(&self, direction: RouteDirection) -> Arc<RouteTable> {
        match direction {
            RouteDirection::Ingress => self.ingress(),
            RouteDirection::Egress => self.egress(),
        }
    }

    /// Rebuild both tables from a bootstrap document.
    ///
    /// Both tables are compiled before either is published.
    pub fn bootstrap_module(&self, bootstrap: &ModuleBootstrap) -> Result<(), RouteTableError> {
        let ingress = self.compile_ingress(&bootstrap.module)?;
        let egress = self.compile_egress(&bootstrap.required_modules)?;
        self.publish(RouteDirection::Ingress, ingress);
        self.publish(RouteDirection::Egress, egress);
        tracing::info!(
            module_id = %bootstrap.module.module_id,
            dependencies = bootstrap.required_modules.len(),
            "Module routes bootstrapped"
        );
        Ok(())
    }

    /// Replace the ingress table with routes of the local module.
    pub fn update_ingress_routes(&self, discovery: &ModuleBootstrapDiscovery) -> Result<(), RouteTableError> {
        let table = self.compile_ingress(discovery)?;
        self.publish(RouteDirection::Ingress, table);
        Ok(())
    }

    /// Replace the egress table with routes of all dependencies.
    pub fn update_egress_routes(&self, discoveries: &[ModuleBootstrapDiscovery]) -> Result<(), RouteTableError> {
        let table = self.compile_egress(discoveries)?;
        self.publish(RouteDirection::Egress, table);
        Ok(())
    }

    fn compile_ingress(&self, discovery: &ModuleBootstrapDiscovery) -> Result<RouteTable, RouteTableError> {
        RouteTable::from_discovery(discovery, self.module_url.as_deref())
            .inspect_err(|e| reject(RouteDirection::Ingress, e))
    }

    fn compile_egress(&self, discoveries: &[ModuleBootstrapDiscovery]) -> Result<RouteTable, RouteTableError> {
        RouteTable::from_discoveries(discoveries).inspect_err(|e| reject(RouteDirection::Egress, e))
    }

    fn publish(&self, direction: RouteDirection, table: RouteTable) {
        let entries = table.len();
        match direction {
            RouteDirection::Ingress => self.ingress.store(Arc::new(table)),
            RouteDirection::Egress => self.egress.store(Arc::new(table)),
        }
        metrics::record_table_swap(direction, entries);
        tracing::info!(direction = %direction, entries, "Route table updated");
    }
}

fn reject(direction: RouteDirection, error: &RouteTableError) {
    metrics::record_table_rejected(direction);
    tracing::error!(
        direction = %direction,
        module_id = %error.module_id(),
        error = %error,
        "Rejected module discovery, keeping current routes"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::types::{EndpointDescriptor, InterfaceDescriptor, InterfaceType};

    fn module(id: &str, pattern: &str) -> ModuleBootstrapDiscovery {
        ModuleBootstrapDiscovery {
            module_id: id.to_string(),
            location: Some(format!("http://{id}:8081")),
            interfaces: vec![InterfaceDescriptor {
                id: "iface".to_string(),
                interface_type: InterfaceType::Regular,
                endpoints: vec![EndpointDescriptor {
                    path_pattern: Some(pattern.to_string()),
                    methods: vec!["*".to_string()],
                    ..Default::default()
                }],
            }],
        }
    }

    #[test]
    fn test_bootstrap_populates_both_tables() {
        let registry = RouteRegistry::new("http://localhost:8080");
        registry
            .bootstrap_module(&ModuleBootstrap {
                module: module("mod-foo-1.0.0", "/foo/*"),
                required_modules: vec![module("mod-bar-1.0.0", "/bar/*")],
            })
            .unwrap();

        let ingress = registry.ingress();
        let entry = ingress.lookup("GET", "/foo/1", None).unwrap();
        assert_eq!(entry.location.as_deref(), Some("http://localhost:8080"));

        let egress = registry.egress();
        let entry = egress.lookup("GET", "/bar/1", None).unwrap();
        assert_eq!(entry.location.as_deref(), Some("http://mod-bar-1.0.0:8081"));
        assert!(egress.lookup("GET", "/foo/1", None).is_none());
    }

    #[test]
    fn test_rejected_update_keeps_previous_table() {
        let registry = RouteRegistry::new("http://localhost:8080");
        registry.update_egress_routes(&[module("mod-bar-1.0.0", "/bar/*")]).unwrap();
        let before = registry.egress();

        let mut broken = module("mod-baz-1.0.0", "/baz/*");
        broken.interfaces[0].endpoints[0].methods.clear();
        assert!(registry
            .update_egress_routes(&[module("mod-bar-2.0.0", "/bar/*"), broken])
            .is_err());

        let after = registry.egress();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.lookup("GET", "/bar/x", None).unwrap().module_id, "mod-bar-1.0.0");
    }

    #[test]
    fn test_bootstrap_is_all_or_nothing() {
        let registry = RouteRegistry::new("http://localhost:8080");
        let mut broken = module("mod-bar-1.0.0", "/bar/*");
        broken.location = Some("::nope::".into());
        let result = registry.bootstrap_module(&ModuleBootstrap {
            module: module("mod-foo-1.0.0", "/foo/*"),
            required_modules: vec![broken],
        });
        assert!(result.is_err());
        assert!(registry.ingress().is_empty());
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let registry = RouteRegistry::with_discovered_locations();
        registry.update_ingress_routes(&module("mod-foo-1.0.0", "/foo/*")).unwrap();
        let held = registry.snapshot(RouteDirection::Ingress);

        registry.update_ingress_routes(&module("mod-foo-2.0.0", "/foo/*")).unwrap();
        assert_eq!(held.lookup("GET", "/foo/a", None).unwrap().module_id, "mod-foo-1.0.0");
        assert_eq!(
            registry.ingress().lookup("GET", "/foo/a", None).unwrap().module_id,
            "mod-foo-2.0.0"
        );
        assert_eq!(
            held.lookup("GET", "/foo/a", None).unwrap().location.as_deref(),
            Some("http://mod-foo-1.0.0:8081")
        );
    }
}
