//! HTTP-backed name resolver

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use super::source::NameSource;
use super::{NameResolver, ResolveError};

/// Fetches names from the upstream API configured for each mode
///
/// The source table can be swapped at runtime when the config file changes.
pub struct HttpNameResolver {
    http: Client,
    sources: RwLock<HashMap<String, NameSource>>,
}

impl HttpNameResolver {
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        sources: HashMap<String, NameSource>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            sources: RwLock::new(sources),
        })
    }

    /// Replace the whole source table
    pub fn replace_sources(&self, sources: HashMap<String, NameSource>) {
        let count = sources.len();
        *self.sources.write() = sources;
        info!("Name source table updated ({} modes)", count);
    }

    pub fn has_source(&self, mode: &str) -> bool {
        self.sources.read().contains_key(mode)
    }
}

#[async_trait]
impl NameResolver for HttpNameResolver {
    async fn names(&self, mode: &str) -> Result<Vec<String>, ResolveError> {
        let source = self.sources.read().get(mode).cloned();
        let Some(source) = source else {
            debug!("No name source for mode '{}'", mode);
            return Ok(Vec::new());
        };

        let response = self
            .http
            .get(&source.url)
            .query(&source.query)
            .send()
            .await
            .map_err(|e| ResolveError::Request {
                url: source.url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                url: source.url,
                status: status.as_u16(),
            });
        }

        let document: Value = response.json().await.map_err(|e| ResolveError::Shape {
            url: source.url.clone(),
            reason: e.to_string(),
        })?;

        let names = source
            .extract(&document)
            .map_err(|reason| ResolveError::Shape {
                url: source.url.clone(),
                reason,
            })?;

        debug!("Resolved {} names for mode '{}'", names.len(), mode);
        Ok(names)
    }
}
