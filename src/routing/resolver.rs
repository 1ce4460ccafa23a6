//! Route resolution strategies.
//!
//! # Responsibilities
//! - Try the enabled strategies in a fixed priority order
//! - Return at most one routing entry per request
//! - Resolve module hints (id or name) for dynamic discovery
//!
//! # Design Decisions
//! - The strategy set is closed: an enum evaluated in declaration order
//! - A plain miss is `Ok(None)`; only malformed hints and collaborator
//!   failures are errors
//! - Dynamic discovery runs before the gateway fallback, which always matches

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::discovery::cache::DiscoveryCache;
use crate::discovery::client::DiscoveryError;
use crate::discovery::entitlements::{EntitlementError, EntitlementSource};
use crate::discovery::module_id;
use crate::http::request::RequestContext;
use crate::routing::entry::{RouteDirection, RoutingEntry};
use crate::routing::path::PathProcessor;
use crate::routing::registry::RouteRegistry;

/// One lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteResolver {
    /// Local module's routes.
    Ingress,
    /// Dependency routes.
    Egress,
    /// On-demand discovery of the module named by the hint header.
    Dynamic,
    /// Catch-all forwarding of unknown egress requests.
    Gateway,
}

impl RouteResolver {
    pub fn direction(&self) -> RouteDirection {
        match self {
            RouteResolver::Ingress => RouteDirection::Ingress,
            RouteResolver::Egress | RouteResolver::Dynamic | RouteResolver::Gateway => RouteDirection::Egress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteResolver::Ingress => "ingress",
            RouteResolver::Egress => "egress",
            RouteResolver::Dynamic => "dynamic",
            RouteResolver::Gateway => "gateway",
        }
    }
}

impl fmt::Display for RouteResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub resolver: RouteResolver,
    pub entry: RoutingEntry,
}

impl ResolvedRoute {
    pub fn direction(&self) -> RouteDirection {
        self.resolver.direction()
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Module hint header is blank")]
    BlankModuleHint,

    #[error("Module '{name}' is not enabled for tenant '{tenant}'")]
    UnknownModuleName { name: String, tenant: String },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Entitlements(#[from] EntitlementError),
}

struct DynamicDiscovery {
    cache: Arc<DiscoveryCache>,
    entitlements: Arc<dyn EntitlementSource>,
}

/// The ordered resolver chain.
pub struct RouteResolvers {
    registry: Arc<RouteRegistry>,
    path_processor: PathProcessor,
    gateway_url: Option<String>,
    dynamic: Option<DynamicDiscovery>,
}

impl RouteResolvers {
    pub fn new(registry: Arc<RouteRegistry>, path_processor: PathProcessor) -> Self {
        Self {
            registry,
            path_processor,
            gateway_url: None,
            dynamic: None,
        }
    }

    /// Forward unmatched egress requests to `url`.
    pub fn with_gateway(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Resolve hinted egress requests through on-demand discovery.
    pub fn with_dynamic_discovery(
        mut self,
        cache: Arc<DiscoveryCache>,
        entitlements: Arc<dyn EntitlementSource>,
    ) -> Self {
        self.dynamic = Some(DynamicDiscovery { cache, entitlements });
        self
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn path_processor(&self) -> &PathProcessor {
        &self.path_processor
    }

    /// Enabled resolvers in evaluation order.
    pub fn chain(&self) -> Vec<RouteResolver> {
        let mut chain = vec![RouteResolver::Ingress, RouteResolver::Egress];
        if self.dynamic.is_some() {
            chain.push(RouteResolver::Dynamic);
        }
        if self.gateway_url.is_some() {
            chain.push(RouteResolver::Gateway);
        }
        chain
    }

    /// First match of the chain, or `None`.
    pub async fn lookup_route(&self, ctx: &RequestContext) -> Result<Option<ResolvedRoute>, ResolveError> {
        for resolver in self.chain() {
            if let Some(entry) = self.resolve(resolver, ctx).await? {
                tracing::debug!(
                    resolver = %resolver,
                    method = %ctx.method,
                    path = %ctx.path,
                    module_id = %entry.module_id,
                    "Route resolved"
                );
                return Ok(Some(ResolvedRoute { resolver, entry }));
            }
        }
        Ok(None)
    }

    /// Run a single strategy.
    pub async fn resolve(
        &self,
        resolver: RouteResolver,
        ctx: &RequestContext,
    ) -> Result<Option<RoutingEntry>, ResolveError> {
        let method = ctx.method.as_str();
        match resolver {
            RouteResolver::Ingress => {
                let path = self.path_processor.lookup_path(&ctx.path);
                Ok(self.registry.ingress().lookup(method, path, ctx.hint()).cloned())
            }
            RouteResolver::Egress => Ok(self.registry.egress().lookup(method, &ctx.path, ctx.hint()).cloned()),
            RouteResolver::Dynamic => match &self.dynamic {
                Some(dynamic) => self.resolve_dynamic(dynamic, ctx).await,
                None => Ok(None),
            },
            RouteResolver::Gateway => Ok(self
                .gateway_url
                .as_deref()
                .map(|url| RoutingEntry::gateway(url, ctx.hint()))),
        }
    }

    async fn resolve_dynamic(
        &self,
        dynamic: &DynamicDiscovery,
        ctx: &RequestContext,
    ) -> Result<Option<RoutingEntry>, ResolveError> {
        if ctx.module_hint.is_none() {
            return Ok(None);
        }
        let hint = ctx.hint().ok_or(ResolveError::BlankModuleHint)?;

        let module_id = if module_id::is_module_id(hint) {
            hint.to_string()
        } else {
            let tenant = ctx.tenant.as_deref().unwrap_or_default();
            let entitled = dynamic.entitlements.entitled_modules(tenant).await?;
            entitled
                .into_iter()
                .find(|id| module_id::module_name(id) == Some(hint))
                .ok_or_else(|| ResolveError::UnknownModuleName {
                    name: hint.to_string(),
                    tenant: tenant.to_string(),
                })?
        };

        let table = dynamic.cache.get_or_load(&module_id).await?;
        Ok(table.lookup(ctx.method.as_str(), &ctx.path, Some(&module_id)).cloned())
    }
}
