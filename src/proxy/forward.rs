//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite headers and attach the correlation id (and signature on egress)
//! - Stream the request body upstream and the response body back
//! - Enforce the per-call timeout until response headers arrive, then as an
//!   idle deadline on every body read in either direction
//! - Emit one transaction record per exchange
//!
//! # Design Decisions
//! - A forward is never retried; the request may not be idempotent
//! - Timeout and connect/stream failure are distinct errors
//! - Errors are converted to HTTP once, at the response boundary

use std::error::Error as StdError;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, Uri};
use http_body::Body as HttpBody;
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::http::request::{chain_request_id, REQUEST_ID_HEADER};
use crate::proxy::headers::{downstream_response_headers, upstream_request_headers};
use crate::proxy::pump::{BodyPump, PumpOutcome};
use crate::proxy::timing::{TransactionRecord, TransactionTimer};
use crate::resilience::timeouts::{with_timeout, TimeoutError};
use crate::routing::entry::{parse_location, RouteDirection};
use crate::security::SidecarSignature;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Invalid destination '{url}': {reason}")]
    InvalidDestination { url: String, reason: String },

    #[error("Upstream '{url}' unreachable: {cause}")]
    UpstreamUnreachable {
        url: String,
        cause: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("Upstream '{url}' did not respond within {after:?}")]
    UpstreamTimeout { url: String, after: Duration },

    #[error("No location known for module '{module_id}'")]
    LocationUnknown { module_id: String },
}

/// Per-call forwarding parameters.
#[derive(Debug, Clone, Copy)]
pub struct ForwardOptions<'a> {
    pub direction: RouteDirection,
    pub module_id: &'a str,
}

/// HTTP client side of the sidecar.
pub struct ForwardProxy {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    pump: BodyPump,
    signature: SidecarSignature,
}

impl ForwardProxy {
    pub fn new(config: &ProxyConfig, signature: SidecarSignature) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let timeout = Duration::from_millis(config.request_timeout_ms);

        Self {
            client,
            timeout,
            pump: BodyPump::new(config.write_queue_frames).with_idle_timeout(timeout),
            signature,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request` to the absolute `destination` URL and stream the answer back.
    pub async fn forward(
        &self,
        request: Request<Body>,
        destination: &str,
        options: ForwardOptions<'_>,
    ) -> Result<Response<Body>, ForwardError> {
        let uri = parse_destination(destination)?;
        let (parts, body) = request.into_parts();

        let mut headers = upstream_request_headers(&parts.headers);
        let existing = parts.headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok());
        let request_id = chain_request_id(existing, uri.path());
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        if options.direction == RouteDirection::Egress {
            self.signature.sign(&mut headers);
        }

        let record = TransactionRecord {
            direction: options.direction,
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            module_id: options.module_id.to_string(),
            request_id: request_id.clone(),
            status: 0,
        };
        let timer = TransactionTimer::start();

        let body = if body.is_end_stream() {
            Body::empty()
        } else {
            let request_id = request_id.clone();
            let pumped = self.pump.pump(body, move |outcome| match outcome {
                PumpOutcome::SourceFailed { cause, bytes } => {
                    tracing::warn!(request_id = %request_id, bytes, cause = %cause, "Inbound request body failed");
                }
                PumpOutcome::TimedOut { bytes, after } => {
                    tracing::warn!(request_id = %request_id, bytes, after = ?after, "Inbound request body stalled");
                }
                PumpOutcome::Completed { .. } | PumpOutcome::ReceiverGone { .. } => {}
            });
            Body::new(pumped.on_first_poll(timer.connected()))
        };

        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method;
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        tracing::debug!(
            request_id = %request_id,
            direction = %options.direction,
            module_id = %options.module_id,
            destination = %destination,
            "Forwarding request"
        );

        let response: Response<Incoming> = match with_timeout(self.timeout, self.client.request(outbound)).await {
            Ok(response) => response,
            Err(TimeoutError::Elapsed(after)) => {
                tracing::warn!(request_id = %request_id, destination = %destination, after = ?after, "Upstream timed out");
                TransactionRecord { status: 504, ..record }.emit_failure(&timer, "timeout");
                return Err(ForwardError::UpstreamTimeout {
                    url: destination.to_string(),
                    after,
                });
            }
            Err(TimeoutError::Failed(e)) => {
                let cause = error_chain(&e);
                tracing::error!(request_id = %request_id, destination = %destination, error = %cause, "Upstream error");
                TransactionRecord { status: 502, ..record }.emit_failure(&timer, "unreachable");
                return Err(ForwardError::UpstreamUnreachable {
                    url: destination.to_string(),
                    cause,
                    source: e,
                });
            }
        };

        let timings = timer.headers_received();
        let (mut parts, body) = response.into_parts();
        parts.headers = downstream_response_headers(&parts.headers);
        let record = TransactionRecord {
            status: parts.status.as_u16(),
            ..record
        };

        let body = if body.is_end_stream() {
            record.emit(timings.connect, timings.headers, timings.total(), "completed");
            Body::empty()
        } else {
            let request_id = request_id.clone();
            Body::new(self.pump.pump(body, move |outcome| {
                if let PumpOutcome::TimedOut { bytes, after } = &outcome {
                    tracing::warn!(request_id = %request_id, bytes, after = ?after, "Upstream response body stalled");
                }
                record.emit(timings.connect, timings.headers, timings.total(), outcome.as_str());
            }))
        };

        Ok(Response::from_parts(parts, body))
    }
}

fn invalid(url: &str, reason: impl Into<String>) -> ForwardError {
    ForwardError::InvalidDestination {
        url: url.to_string(),
        reason: reason.into(),
    }
}

fn parse_destination(destination: &str) -> Result<Uri, ForwardError> {
    parse_location(destination).map_err(|reason| invalid(destination, reason))
}

/// `error: cause: cause...`
fn error_chain(e: &(dyn StdError + 'static)) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
