//! Header filtering for forwarded requests and responses.
//!
//! Hop-by-hop headers, and any header named in `Connection`, describe a
//! single connection and are never copied across the proxy. Client
//! `User-Agent` and `Host` are dropped on the way upstream; the signature
//! header never reaches the module or the caller.

use axum::http::{header, HeaderMap, HeaderName};

use crate::security::SIGNATURE_HEADER;

const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Header names listed in `Connection: a, b`.
fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn copy_filtered(source: &HeaderMap, skip: impl Fn(&HeaderName) -> bool) -> HeaderMap {
    let listed = connection_tokens(source);
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if is_hop_by_hop_header(name) || listed.iter().any(|token| token == name.as_str()) || skip(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers copied from the caller to the upstream request.
pub fn upstream_request_headers(source: &HeaderMap) -> HeaderMap {
    copy_filtered(source, |name| {
        *name == header::USER_AGENT || *name == header::HOST || *name == SIGNATURE_HEADER
    })
}

/// Headers copied from the upstream response back to the caller.
pub fn downstream_response_headers(source: &HeaderMap) -> HeaderMap {
    copy_filtered(source, |name| *name == SIGNATURE_HEADER)
}
