//! Request context extraction.
//!
//! # Responsibilities
//! - Name the platform headers the sidecar reads and writes
//! - Extract routing-relevant information (method, path, tenant, hint)
//! - Generate correlation ids for forwarded requests
//!
//! # Design Decisions
//! - Context is built once per request and borrowed by resolvers
//! - Correlation ids keep prior hops visible by appending, never replacing

use axum::http::{HeaderMap, HeaderName, Method, Uri};
use rand::Rng;

use crate::security::SidecarSignature;

pub const TENANT_HEADER: HeaderName = HeaderName::from_static("x-okapi-tenant");
pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("x-okapi-token");
pub const SYSTEM_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-system-token");
pub const MODULE_ID_HEADER: HeaderName = HeaderName::from_static("x-okapi-module-id");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-okapi-request-id");

/// Separator between hops in a chained correlation id.
const REQUEST_ID_SEPARATOR: char = ';';

/// Routing view of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub tenant: Option<String>,
    /// Raw hint header value; may be blank.
    pub module_hint: Option<String>,
    pub request_id: Option<String>,
    pub self_request: bool,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            tenant: None,
            module_hint: None,
            request_id: None,
            self_request: false,
        }
    }

    /// Build the context from request metadata.
    pub fn from_parts(method: &Method, uri: &Uri, headers: &HeaderMap, signature: &SidecarSignature) -> Self {
        Self {
            method: method.clone(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            tenant: header_str(headers, &TENANT_HEADER),
            module_hint: header_str(headers, &MODULE_ID_HEADER),
            request_id: header_str(headers, &REQUEST_ID_HEADER),
            self_request: signature.is_signed_by_self(headers),
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_module_hint(mut self, hint: impl Into<String>) -> Self {
        self.module_hint = Some(hint.into());
        self
    }

    /// Hint value if present and non-blank.
    pub fn hint(&self) -> Option<&str> {
        self.module_hint
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
    }

    /// `path?query` as sent upstream.
    pub fn path_and_query(&self, path: &str) -> String {
        match &self.query {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Fresh correlation id: six random digits and the first path segment.
pub fn next_request_id(path: &str) -> String {
    let number: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let segment = path
        .trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .unwrap_or_default();
    format!("{number:06}/{segment}")
}

/// Append a fresh id to an existing chain.
pub fn chain_request_id(existing: Option<&str>, path: &str) -> String {
    let next = next_request_id(path);
    match existing.map(str::trim).filter(|id| !id.is_empty()) {
        Some(existing) => format!("{existing}{REQUEST_ID_SEPARATOR}{next}"),
        None => next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn assert_id_shape(id: &str, segment: &str) {
        let (digits, rest) = id.split_once('/').unwrap();
        assert_eq!(digits.len(), 6);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(rest, segment);
    }

    #[test]
    fn test_next_request_id_shape() {
        assert_id_shape(&next_request_id("/foo/entities/1"), "foo");
        assert_id_shape(&next_request_id("/"), "");
    }

    #[test]
    fn test_chain_appends_to_existing() {
        let id = chain_request_id(Some("123456/bar"), "/foo/x");
        let (first, second) = id.split_once(';').unwrap();
        assert_eq!(first, "123456/bar");
        assert_id_shape(second, "foo");

        assert!(!chain_request_id(Some("  "), "/foo").contains(';'));
    }

    #[test]
    fn test_context_from_parts() {
        let signature = SidecarSignature::generate();
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("diku"));
        headers.insert(MODULE_ID_HEADER, HeaderValue::from_static("mod-baz-1.0.0"));
        signature.sign(&mut headers);
        let uri: Uri = "/bam/multi/entities/7?limit=10".parse().unwrap();

        let ctx = RequestContext::from_parts(&Method::GET, &uri, &headers, &signature);
        assert_eq!(ctx.path, "/bam/multi/entities/7");
        assert_eq!(ctx.query.as_deref(), Some("limit=10"));
        assert_eq!(ctx.tenant.as_deref(), Some("diku"));
        assert_eq!(ctx.hint(), Some("mod-baz-1.0.0"));
        assert!(ctx.self_request);
        assert_eq!(ctx.path_and_query("/x"), "/x?limit=10");
    }

    #[test]
    fn test_blank_hint_is_not_a_hint() {
        let ctx = RequestContext::new(Method::GET, "/foo").with_module_hint("  ");
        assert_eq!(ctx.hint(), None);
        assert!(ctx.module_hint.is_some());
    }
}
