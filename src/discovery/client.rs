//! Control-plane discovery client.
//!
//! # Responsibilities
//! - Fetch the module bootstrap (local module + dependencies)
//! - Fetch discovery for a single module on demand
//! - Enforce a per-call timeout on every control-plane request

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::ControlPlaneConfig;
use crate::discovery::types::{ModuleBootstrap, ModuleBootstrapDiscovery};
use crate::routing::table::RouteTableError;

/// Errors that can occur while talking to the control plane.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid control plane URL '{0}'")]
    InvalidUrl(String),

    #[error("Control plane request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Control plane returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    InvalidModule(#[from] RouteTableError),
}

/// Source of discovery documents.
pub trait DiscoverySource: Send + Sync {
    /// Bootstrap of the given module: its own discovery plus dependencies.
    fn fetch_bootstrap<'a>(&'a self, module_id: &'a str) -> BoxFuture<'a, Result<ModuleBootstrap, DiscoveryError>>;

    /// Discovery of a single module.
    fn fetch_discovery<'a>(
        &'a self,
        module_id: &'a str,
    ) -> BoxFuture<'a, Result<ModuleBootstrapDiscovery, DiscoveryError>>;
}

/// `DiscoverySource` backed by the control-plane HTTP API.
///
/// - `GET {url}/modules/{id}` → bootstrap
/// - `GET {url}/modules/{id}/discovery` → single module discovery
#[derive(Debug, Clone)]
pub struct HttpDiscoverySource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDiscoverySource {
    pub fn new(config: &ControlPlaneConfig) -> Result<Self, DiscoveryError> {
        let base_url = Url::parse(&config.url).map_err(|_| DiscoveryError::InvalidUrl(config.url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(DiscoveryError::InvalidUrl(config.url.clone()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, DiscoveryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DiscoveryError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, DiscoveryError> {
        tracing::debug!(url = %url, "Fetching discovery");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

impl DiscoverySource for HttpDiscoverySource {
    fn fetch_bootstrap<'a>(&'a self, module_id: &'a str) -> BoxFuture<'a, Result<ModuleBootstrap, DiscoveryError>> {
        async move {
            let url = self.url_for(&["modules", module_id])?;
            self.get_json(url).await
        }
        .boxed()
    }

    fn fetch_discovery<'a>(
        &'a self,
        module_id: &'a str,
    ) -> BoxFuture<'a, Result<ModuleBootstrapDiscovery, DiscoveryError>> {
        async move {
            let url = self.url_for(&["modules", module_id, "discovery"])?;
            self.get_json(url).await
        }
        .boxed()
    }
}
