//! Configuration management for Overlay Hub
//!
//! Handles loading, parsing, and hot-reloading of the YAML configuration file.
//! Every section has defaults, so an empty file (or no file at all) is a
//! valid configuration.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::resolver::{default_sources, NameSource};
use crate::state::{OverlayState, DEFAULT_MODE, DEFAULT_NAME, DEFAULT_SHINY_MODE};

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub overlay: OverlayConfig,
    pub resolver: ResolverConfig,
    pub providers: ProvidersConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Interval between keep-alive comments on idle streams
    pub keep_alive_secs: u64,
}

/// Initial overlay state and mode rules
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub mode: String,
    pub name: String,
    /// Mode in which `toggle_shiny` is effective
    pub shiny_mode: String,
}

/// Name lookup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Per-mode upstream sources; modes without one resolve to no names
    pub sources: HashMap<String, NameSource>,
}

/// Provider settings storage
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            mode: DEFAULT_MODE.to_string(),
            name: DEFAULT_NAME.to_string(),
            shiny_mode: DEFAULT_SHINY_MODE.to_string(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            sources: default_sources(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            path: "providers.json".to_string(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    crate::api::DEFAULT_API_PORT
}

fn default_keep_alive_secs() -> u64 {
    15
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("overlay-hub/{}", env!("CARGO_PKG_VERSION"))
}

impl ServerConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl OverlayConfig {
    /// State the store starts with
    pub fn initial_state(&self) -> OverlayState {
        OverlayState::new(self.mode.clone(), self.name.clone())
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;

        Ok(config)
    }

    /// Parse and validate YAML configuration
    pub fn parse(contents: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("server.host cannot be empty");
        }
        if self.server.keep_alive_secs == 0 {
            anyhow::bail!("server.keep_alive_secs must be at least 1");
        }
        if self.overlay.shiny_mode.is_empty() {
            anyhow::bail!("overlay.shiny_mode cannot be empty");
        }
        if self.resolver.timeout_ms == 0 {
            anyhow::bail!("resolver.timeout_ms must be at least 1");
        }

        for (mode, source) in &self.resolver.sources {
            if source.url.is_empty() {
                anyhow::bail!("Name source '{}': url cannot be empty", mode);
            }
            if !source.items.is_empty() && !source.items.starts_with('/') {
                anyhow::bail!(
                    "Name source '{}': items must be a JSON pointer (start with '/')",
                    mode
                );
            }
            if !source.field.starts_with('/') {
                anyhow::bail!(
                    "Name source '{}': field must be a JSON pointer (start with '/')",
                    mode
                );
            }
        }

        if self.providers.path.is_empty() {
            anyhow::bail!("providers.path cannot be empty");
        }

        Ok(())
    }
}
