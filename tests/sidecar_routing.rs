//! End-to-end routing through the sidecar server.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;

use module_sidecar::config::ProxyConfig;
use module_sidecar::discovery::{InterfaceType, ModuleBootstrap};
use module_sidecar::routing::{PathPrefixStrategy, RouteRegistry};
use module_sidecar::security::SidecarSignature;

mod common;

const FOO: &[(&str, &[&str])] = &[
    ("/foo/entities", &["GET", "POST"]),
    ("/foo/entities/{id}", &["GET"]),
];

/// Registry with `mod-foo` behind `module_url` and `mod-bar` at `bar_location`.
fn registry(module_url: &str, bar_location: String) -> Arc<RouteRegistry> {
    let registry = Arc::new(RouteRegistry::new(module_url));
    registry
        .bootstrap_module(&ModuleBootstrap {
            module: common::module("mod-foo-1.0.0", None, InterfaceType::Regular, FOO),
            required_modules: vec![common::module(
                "mod-bar-1.0.0",
                Some(bar_location),
                InterfaceType::Regular,
                &[("/bar/*", &["*"][..])],
            )],
        })
        .unwrap();
    registry
}

fn header<'a>(echo: &'a Value, name: &str) -> Option<&'a str> {
    echo["headers"][name].as_str()
}

#[tokio::test]
async fn test_ingress_forwarding_rewrites_headers() {
    let backend = common::start_echo_backend().await;
    let registry = registry(&format!("http://{backend}"), "http://127.0.0.1:1".into());
    let dispatcher = common::dispatcher(
        registry,
        PathPrefixStrategy::None,
        &ProxyConfig::default(),
        None,
        SidecarSignature::generate(),
    );
    let sidecar = common::start_sidecar(Arc::new(dispatcher)).await;

    let response = common::client()
        .get(format!("http://{sidecar}/foo/entities/abc123?limit=5"))
        .header("user-agent", "test-client/1.0")
        .header("x-okapi-tenant", "diku")
        .header("x-okapi-request-id", "111111/bar")
        .header("x-okapi-sidecar-signature", "forged")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-okapi-sidecar-signature").is_none());
    assert_eq!(response.headers()["x-upstream"], "echo");

    let echo = common::echoed(response).await;
    assert_eq!(echo["path"], "/foo/entities/abc123");
    assert_eq!(echo["query"], "limit=5");
    assert_eq!(header(&echo, "x-okapi-tenant"), Some("diku"));
    assert_eq!(header(&echo, "user-agent"), None);
    assert_eq!(header(&echo, "x-okapi-sidecar-signature"), None);

    let request_id = header(&echo, "x-okapi-request-id").unwrap();
    let (previous, added) = request_id.split_once(';').unwrap();
    assert_eq!(previous, "111111/bar");
    assert!(added.ends_with("/foo"));
    assert_eq!(added.len(), "000000/foo".len());
}

#[tokio::test]
async fn test_egress_forwarding_is_signed() {
    let backend = common::start_echo_backend().await;
    let signature = SidecarSignature::generate();
    let registry = registry("http://127.0.0.1:1", format!("http://{backend}"));
    let dispatcher = common::dispatcher(
        registry,
        PathPrefixStrategy::None,
        &ProxyConfig::default(),
        None,
        signature.clone(),
    );
    let sidecar = common::start_sidecar(Arc::new(dispatcher)).await;

    let response = common::client()
        .post(format!("http://{sidecar}/bar/items/7"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let echo = common::echoed(response).await;
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/bar/items/7");
    assert_eq!(echo["body_len"], 7);
    assert_eq!(
        header(&echo, "x-okapi-sidecar-signature"),
        signature.header_value().to_str().ok()
    );
}

#[tokio::test]
async fn test_unmatched_route_is_404() {
    let registry = registry("http://127.0.0.1:1", "http://127.0.0.1:1".into());
    let dispatcher = common::dispatcher(
        registry,
        PathPrefixStrategy::None,
        &ProxyConfig::default(),
        None,
        SidecarSignature::generate(),
    );
    let sidecar = common::start_sidecar(Arc::new(dispatcher)).await;

    let response = common::client()
        .delete(format!("http://{sidecar}/foo/entities"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_records"], 1);
    assert_eq!(
        body["errors"][0]["message"],
        "Route is not found [method: DELETE, path: /foo/entities]"
    );
}

#[tokio::test]
async fn test_unknown_requests_go_to_gateway() {
    let gateway = common::start_echo_backend().await;
    let registry = registry("http://127.0.0.1:1", "http://127.0.0.1:1".into());
    let dispatcher = common::dispatcher(
        registry,
        PathPrefixStrategy::None,
        &ProxyConfig::default(),
        Some(format!("http://{gateway}")),
        SidecarSignature::generate(),
    );
    let sidecar = common::start_sidecar(Arc::new(dispatcher)).await;

    let response = common::client()
        .get(format!("http://{sidecar}/baz/entities"))
        .header("x-okapi-module-id", "mod-baz-1.0.0")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let echo = common::echoed(response).await;
    assert_eq!(echo["path"], "/baz/entities");
    assert_eq!(header(&echo, "x-okapi-module-id"), Some("mod-baz-1.0.0"));
}

#[tokio::test]
async fn test_strip_prefix_strategy() {
    let backend = common::start_echo_backend().await;
    let registry = registry(&format!("http://{backend}"), "http://127.0.0.1:1".into());
    let dispatcher = common::dispatcher(
        registry,
        PathPrefixStrategy::Strip,
        &ProxyConfig::default(),
        None,
        SidecarSignature::generate(),
    );
    let sidecar = common::start_sidecar(Arc::new(dispatcher)).await;

    let response = common::client()
        .get(format!("http://{sidecar}/mod-foo/foo/entities/42"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::echoed(response).await["path"], "/foo/entities/42");
}

#[tokio::test]
async fn test_timeout_is_distinct_from_connect_failure() {
    let silent = common::start_silent_backend().await;
    let closed = common::closed_port();
    let proxy = ProxyConfig {
        request_timeout_ms: 200,
        ..Default::default()
    };

    let slow = registry(&format!("http://{silent}"), format!("http://{closed}"));
    let dispatcher = common::dispatcher(slow, PathPrefixStrategy::None, &proxy, None, SidecarSignature::generate());
    let sidecar = common::start_sidecar(Arc::new(dispatcher)).await;
    let client = common::client();

    let started = std::time::Instant::now();
    let timed_out = client
        .get(format!("http://{sidecar}/foo/entities/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(timed_out.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(5));
    let body: Value = timed_out.json().await.unwrap();
    assert_eq!(body["errors"][0]["code"], "upstream_timeout");

    let refused = client
        .get(format!("http://{sidecar}/bar/anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::BAD_GATEWAY);
    let body: Value = refused.json().await.unwrap();
    assert_eq!(body["errors"][0]["code"], "upstream_unreachable");
}

#[tokio::test]
async fn test_stalled_response_body_is_abandoned() {
    let stalling = common::start_stalling_backend().await;
    let proxy = ProxyConfig {
        request_timeout_ms: 200,
        ..Default::default()
    };
    let registry = registry(&format!("http://{stalling}"), format!("http://{stalling}"));
    let dispatcher = common::dispatcher(registry, PathPrefixStrategy::None, &proxy, None, SidecarSignature::generate());
    let sidecar = common::start_sidecar(Arc::new(dispatcher)).await;

    let response = common::client()
        .get(format!("http://{sidecar}/foo/entities/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = tokio::time::timeout(Duration::from_secs(3), response.bytes())
        .await
        .expect("stalled upstream body must be cut off");
    assert!(body.is_err(), "truncated body must not look complete: {body:?}");
}

#[tokio::test]
async fn test_large_body_streams_through() {
    let backend = common::start_echo_backend().await;
    let registry = registry("http://127.0.0.1:1", format!("http://{backend}"));
    let proxy = ProxyConfig {
        write_queue_frames: 2,
        ..Default::default()
    };
    let dispatcher = common::dispatcher(registry, PathPrefixStrategy::None, &proxy, None, SidecarSignature::generate());
    let sidecar = common::start_sidecar(Arc::new(dispatcher)).await;

    let payload = vec![b'x'; 4 * 1024 * 1024];
    let response = common::client()
        .put(format!("http://{sidecar}/bar/blob"))
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::echoed(response).await["body_len"], 4 * 1024 * 1024);
}
