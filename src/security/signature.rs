//! Self-request signature.
//!
//! # Responsibilities
//! - Generate one random signature per process at startup
//! - Attach it to egress forwards
//! - Recognise requests that looped back through this sidecar
//!
//! # Design Decisions
//! - Read-only after construction; shared by cloning the handle
//! - Never forwarded to the local module or returned to callers

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

/// Header carrying the signature on egress requests.
pub const SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-okapi-sidecar-signature");

/// Process-wide signature value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarSignature {
    value: HeaderValue,
}

impl SidecarSignature {
    /// Generate a fresh random signature.
    pub fn generate() -> Self {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("sidecar"));
        Self { value }
    }

    /// Use a known value (tests, fixed deployments).
    pub fn from_header_value(value: HeaderValue) -> Self {
        Self { value }
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.value
    }

    /// True if the request was signed by this process.
    pub fn is_signed_by_self(&self, headers: &HeaderMap) -> bool {
        headers
            .get_all(SIGNATURE_HEADER)
            .iter()
            .any(|value| *value == self.value)
    }

    /// Attach the signature, replacing any existing value.
    pub fn sign(&self, headers: &mut HeaderMap) {
        headers.insert(SIGNATURE_HEADER, self.value.clone());
    }
}
