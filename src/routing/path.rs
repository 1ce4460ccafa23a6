//! Module-name path prefix handling.
//!
//! # Strategies
//! - `none`: paths are used as received
//! - `strip`: ingress paths arrive as `/<module-name>/...`; the prefix is
//!   removed before lookup and before forwarding to the module
//! - `proxy`: ingress paths arrive without the prefix and are looked up as
//!   is; the module serves under `/<module-name>`, so the prefix is added
//!   when forwarding

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathPrefixStrategy {
    #[default]
    None,
    Strip,
    Proxy,
}

/// Applies the configured prefix strategy to ingress paths.
#[derive(Debug, Clone)]
pub struct PathProcessor {
    strategy: PathPrefixStrategy,
    prefix: String,
}

impl PathProcessor {
    pub fn new(module_name: &str, strategy: PathPrefixStrategy) -> Self {
        Self {
            strategy,
            prefix: format!("/{}", module_name.trim_matches('/')),
        }
    }

    pub fn strategy(&self) -> PathPrefixStrategy {
        self.strategy
    }

    /// Path used to look up the ingress route table.
    pub fn lookup_path<'a>(&self, path: &'a str) -> &'a str {
        match self.strategy {
            PathPrefixStrategy::Strip => self.strip(path),
            PathPrefixStrategy::None | PathPrefixStrategy::Proxy => path,
        }
    }

    /// Path sent to the module when forwarding an ingress request.
    pub fn module_path<'a>(&self, path: &'a str) -> Cow<'a, str> {
        match self.strategy {
            PathPrefixStrategy::None => Cow::Borrowed(path),
            PathPrefixStrategy::Strip => Cow::Borrowed(self.strip(path)),
            PathPrefixStrategy::Proxy if self.has_prefix(path) => Cow::Borrowed(path),
            PathPrefixStrategy::Proxy => Cow::Owned(format!("{}{}", self.prefix, path)),
        }
    }

    fn has_prefix(&self, path: &str) -> bool {
        path.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    fn strip<'a>(&self, path: &'a str) -> &'a str {
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }
}
