//! Error responses.
//!
//! # Responsibilities
//! - Convert resolver and forward failures to HTTP once, at the boundary
//! - Render the platform's JSON error envelope
//!
//! # Design Decisions
//! - Upstream details stay in logs; callers get the status and a short message
//! - Timeouts map to 504, connect/stream failures to 502

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::proxy::ForwardError;
use crate::routing::resolver::ResolveError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: &'static str,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ErrorDetail>,
    pub total_records: usize,
}

/// A failed request, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: ErrorDetail,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            detail: ErrorDetail {
                error_type,
                code,
                message: message.into(),
            },
        }
    }

    pub fn route_not_found(method: &Method, path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "RouteNotFound",
            "route_not_found",
            format!("Route is not found [method: {method}, path: {path}]"),
        )
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            errors: vec![self.detail.clone()],
            total_records: 1,
        }
    }
}

impl From<ForwardError> for ApiError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::InvalidDestination { url, .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InvalidDestination",
                "invalid_destination",
                format!("Invalid upstream destination: {url}"),
            ),
            ForwardError::UpstreamUnreachable { url, .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                "UpstreamUnreachable",
                "upstream_unreachable",
                format!("Failed to proxy request to {url}"),
            ),
            ForwardError::UpstreamTimeout { url, after } => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                "UpstreamTimeout",
                "upstream_timeout",
                format!("Upstream {url} did not respond within {} ms", after.as_millis()),
            ),
            ForwardError::LocationUnknown { module_id } => Self::new(
                StatusCode::BAD_GATEWAY,
                "UpstreamUnreachable",
                "location_unknown",
                format!("Module {module_id} has no known location"),
            ),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::BlankModuleHint => Self::new(
                StatusCode::BAD_REQUEST,
                "BadRequest",
                "blank_module_hint",
                "Module id header must not be blank",
            ),
            ResolveError::UnknownModuleName { name, tenant } => Self::new(
                StatusCode::NOT_FOUND,
                "ModuleNotFound",
                "module_not_found",
                format!("Module {name} is not enabled for tenant {tenant}"),
            ),
            ResolveError::Discovery(e) => Self::new(
                StatusCode::BAD_GATEWAY,
                "DiscoveryFailure",
                "discovery_failed",
                e.to_string(),
            ),
            ResolveError::Entitlements(e) => Self::new(
                StatusCode::BAD_GATEWAY,
                "DiscoveryFailure",
                "entitlements_failed",
                e.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.envelope())).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
