//! Per-request orchestration.
//!
//! # Responsibilities
//! - Build the request context once
//! - Run the resolver chain; answer 404 on a miss
//! - Hand the request to the ingress or egress handler
//!
//! # Design Decisions
//! - Resolution failures become responses here; nothing propagates past
//!   the dispatcher
//! - Ingress paths go through the module-name prefix strategy; egress
//!   paths are forwarded unchanged

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::http::request::RequestContext;
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::proxy::{ForwardError, ForwardOptions, ForwardProxy};
use crate::routing::entry::{RouteDirection, RoutingEntry};
use crate::routing::resolver::RouteResolvers;
use crate::security::SidecarSignature;

pub struct Dispatcher {
    resolvers: RouteResolvers,
    proxy: ForwardProxy,
    signature: SidecarSignature,
}

impl Dispatcher {
    pub fn new(resolvers: RouteResolvers, proxy: ForwardProxy, signature: SidecarSignature) -> Self {
        Self {
            resolvers,
            proxy,
            signature,
        }
    }

    pub fn resolvers(&self) -> &RouteResolvers {
        &self.resolvers
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let ctx = RequestContext::from_parts(request.method(), request.uri(), request.headers(), &self.signature);
        if ctx.self_request {
            tracing::debug!(method = %ctx.method, path = %ctx.path, "Request signed by this sidecar");
        }

        let resolved = match self.resolvers.lookup_route(&ctx).await {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                metrics::record_route_miss();
                tracing::warn!(method = %ctx.method, path = %ctx.path, "No route matched");
                return ApiError::route_not_found(&ctx.method, &ctx.path).into_response();
            }
            Err(e) => {
                tracing::warn!(method = %ctx.method, path = %ctx.path, error = %e, "Route resolution failed");
                return ApiError::from(e).into_response();
            }
        };

        let result = match resolved.direction() {
            RouteDirection::Ingress => self.handle_ingress(request, &ctx, &resolved.entry).await,
            RouteDirection::Egress => self.handle_egress(request, &ctx, &resolved.entry).await,
        };
        result.unwrap_or_else(|e| ApiError::from(e).into_response())
    }

    async fn handle_ingress(
        &self,
        request: Request<Body>,
        ctx: &RequestContext,
        entry: &RoutingEntry,
    ) -> Result<Response, ForwardError> {
        let path = self.resolvers.path_processor().module_path(&ctx.path);
        self.forward_to(request, ctx, entry, &path, RouteDirection::Ingress).await
    }

    async fn handle_egress(
        &self,
        request: Request<Body>,
        ctx: &RequestContext,
        entry: &RoutingEntry,
    ) -> Result<Response, ForwardError> {
        self.forward_to(request, ctx, entry, &ctx.path, RouteDirection::Egress).await
    }

    async fn forward_to(
        &self,
        request: Request<Body>,
        ctx: &RequestContext,
        entry: &RoutingEntry,
        path: &str,
        direction: RouteDirection,
    ) -> Result<Response, ForwardError> {
        let location = entry.location.as_deref().ok_or_else(|| ForwardError::LocationUnknown {
            module_id: entry.module_id.clone(),
        })?;
        let destination = destination_url(location, &ctx.path_and_query(path));
        let options = ForwardOptions {
            direction,
            module_id: &entry.module_id,
        };
        self.proxy.forward(request, &destination, options).await
    }
}

/// Join a base URL and an absolute path.
pub fn destination_url(location: &str, path_and_query: &str) -> String {
    format!("{}{}", location.trim_end_matches('/'), path_and_query)
}
