//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use module_sidecar::config::ProxyConfig;
use module_sidecar::discovery::{
    EndpointDescriptor, InterfaceDescriptor, InterfaceType, ModuleBootstrap, ModuleBootstrapDiscovery,
};
use module_sidecar::http::{Dispatcher, SidecarServer};
use module_sidecar::proxy::ForwardProxy;
use module_sidecar::routing::{PathPrefixStrategy, PathProcessor, RouteRegistry, RouteResolvers};
use module_sidecar::security::SidecarSignature;

async fn bind_local() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").await.unwrap()
}

/// Backend answering every request with a JSON description of what it received.
///
/// The response also carries a signature header, which the sidecar must strip.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = bind_local().await;
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body_len = axum::body::to_bytes(body, usize::MAX)
        .await
        .map(|bytes| bytes.len())
        .unwrap_or(0);

    let mut headers = Map::new();
    for (name, value) in &parts.headers {
        headers.insert(name.to_string(), json!(value.to_str().unwrap_or_default()));
    }

    let mut response = Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body_len": body_len,
    }))
    .into_response();
    response
        .headers_mut()
        .insert("x-okapi-sidecar-signature", HeaderValue::from_static("upstream-signature"));
    response
        .headers_mut()
        .insert("x-upstream", HeaderValue::from_static("echo"));
    response
}

/// Backend that accepts connections and reads, but never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = bind_local().await;
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    addr
}

/// Backend that sends headers and the first bytes of a longer body, then stalls.
pub async fn start_stalling_backend() -> SocketAddr {
    let listener = bind_local().await;
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 100\r\n\r\nabc";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

#[derive(Clone)]
struct ControlPlane {
    bootstrap: Arc<ModuleBootstrap>,
    modules: Arc<Vec<ModuleBootstrapDiscovery>>,
}

/// Control plane serving one bootstrap and per-module discovery documents.
pub async fn start_control_plane(bootstrap: ModuleBootstrap, modules: Vec<ModuleBootstrapDiscovery>) -> SocketAddr {
    let state = ControlPlane {
        bootstrap: Arc::new(bootstrap),
        modules: Arc::new(modules),
    };
    let app = Router::new()
        .route("/modules/{id}", get(bootstrap_handler))
        .route("/modules/{id}/discovery", get(discovery_handler))
        .with_state(state);

    let listener = bind_local().await;
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn bootstrap_handler(State(state): State<ControlPlane>, Path(id): Path<String>) -> Response {
    if state.bootstrap.module.module_id == id {
        Json(state.bootstrap.as_ref().clone()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn discovery_handler(State(state): State<ControlPlane>, Path(id): Path<String>) -> Response {
    match state.modules.iter().find(|m| m.module_id == id) {
        Some(module) => Json(module.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve the dispatcher on a local port.
pub async fn start_sidecar(dispatcher: Arc<Dispatcher>) -> SocketAddr {
    let listener = bind_local().await;
    let addr = listener.local_addr().unwrap();
    let app = SidecarServer::new(dispatcher).into_router();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Dispatcher over `registry` with the given prefix strategy and proxy settings.
pub fn dispatcher(
    registry: Arc<RouteRegistry>,
    strategy: PathPrefixStrategy,
    proxy: &ProxyConfig,
    gateway: Option<String>,
    signature: SidecarSignature,
) -> Dispatcher {
    let mut resolvers = RouteResolvers::new(registry, PathProcessor::new("mod-foo", strategy));
    if let Some(gateway) = gateway {
        resolvers = resolvers.with_gateway(gateway);
    }
    Dispatcher::new(resolvers, ForwardProxy::new(proxy, signature.clone()), signature)
}

/// One-interface module discovery.
pub fn module(
    id: &str,
    location: Option<String>,
    interface_type: InterfaceType,
    endpoints: &[(&str, &[&str])],
) -> ModuleBootstrapDiscovery {
    ModuleBootstrapDiscovery {
        module_id: id.to_string(),
        location,
        interfaces: vec![InterfaceDescriptor {
            id: format!("{id}-api"),
            interface_type,
            endpoints: endpoints
                .iter()
                .map(|(pattern, methods)| EndpointDescriptor {
                    path_pattern: Some(pattern.to_string()),
                    methods: methods.iter().map(|m| m.to_string()).collect(),
                    ..Default::default()
                })
                .collect(),
        }],
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Parse an echo response body.
pub async fn echoed(response: reqwest::Response) -> Value {
    response.json::<Value>().await.unwrap()
}
