//! Tenant entitlement lookup.
//!
//! The list of modules a tenant is entitled to is maintained elsewhere and
//! cached outside the routing core; this trait is the narrow seam used to
//! resolve a module name hint to a module id.

use std::collections::HashMap;

use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Entitlement lookup failed for tenant '{tenant}': {reason}")]
pub struct EntitlementError {
    pub tenant: String,
    pub reason: String,
}

/// Source of entitled module ids per tenant.
pub trait EntitlementSource: Send + Sync {
    fn entitled_modules<'a>(&'a self, tenant: &'a str) -> BoxFuture<'a, Result<Vec<String>, EntitlementError>>;
}

/// Fixed in-memory entitlements.
#[derive(Debug, Clone, Default)]
pub struct StaticEntitlements {
    by_tenant: HashMap<String, Vec<String>>,
}

impl StaticEntitlements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant<I, S>(mut self, tenant: &str, module_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_tenant
            .insert(tenant.to_string(), module_ids.into_iter().map(Into::into).collect());
        self
    }
}

impl From<HashMap<String, Vec<String>>> for StaticEntitlements {
    fn from(by_tenant: HashMap<String, Vec<String>>) -> Self {
        Self { by_tenant }
    }
}

impl EntitlementSource for StaticEntitlements {
    fn entitled_modules<'a>(&'a self, tenant: &'a str) -> BoxFuture<'a, Result<Vec<String>, EntitlementError>> {
        future::ready(Ok(self.by_tenant.get(tenant).cloned().unwrap_or_default())).boxed()
    }
}
