//! Name resolver - lists the selectable entity names for a mode
//!
//! Names come from third-party APIs. The HTTP layer treats every resolver
//! failure as "no names", so nothing here can block the control path or the
//! streams.

pub mod http;
pub mod source;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpNameResolver;
pub use source::{default_sources, NameSource};

/// Errors raised while resolving names
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response shape from {url}: {reason}")]
    Shape { url: String, reason: String },
}

/// Maps a mode to the list of entity names available in it
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Names for `mode`; an unknown mode yields an empty list
    async fn names(&self, mode: &str) -> Result<Vec<String>, ResolveError>;
}

/// Resolver with a fixed in-memory table, for tests and offline use
#[derive(Debug, Default, Clone)]
pub struct StaticNameResolver {
    names: std::collections::HashMap<String, Vec<String>>,
}

impl StaticNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(mut self, mode: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names
            .insert(mode.to_string(), names.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl NameResolver for StaticNameResolver {
    async fn names(&self, mode: &str) -> Result<Vec<String>, ResolveError> {
        Ok(self.names.get(mode).cloned().unwrap_or_default())
    }
}
