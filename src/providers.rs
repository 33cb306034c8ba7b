//! Provider settings - which modes are offered to the control panel
//!
//! Stored as a JSON object keyed by mode, usually
//! `{ "<mode>": { "enabled": bool, "label": "..." } }`, in a single file.
//! The object is passed through as-is: entries are not validated and key
//! order is kept, since the control panel lists modes in file order.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid provider settings in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// All provider settings, keyed by mode, in insertion order
pub type ProviderSettings = Map<String, Value>;

/// File-backed provider settings
pub struct ProviderStore {
    path: PathBuf,
    /// Serializes writers so concurrent saves never interleave
    write_lock: Mutex<()>,
}

impl ProviderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings; a missing file reads as empty
    pub async fn load(&self) -> Result<ProviderSettings, ProviderError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No provider settings at {}", self.path.display());
                return Ok(ProviderSettings::new());
            },
            Err(e) => {
                return Err(ProviderError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            },
        };

        serde_json::from_str(&contents).map_err(|e| ProviderError::Json {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Replace the stored settings
    pub async fn save(&self, settings: &ProviderSettings) -> Result<(), ProviderError> {
        let json = serde_json::to_string_pretty(settings).map_err(|e| ProviderError::Json {
            path: self.path.clone(),
            source: e,
        })?;

        let _guard = self.write_lock.lock().await;
        fs::write(&self.path, json)
            .await
            .map_err(|e| ProviderError::Io {
                path: self.path.clone(),
                source: e,
            })?;

        info!(
            "Saved {} provider setting(s) to {}",
            settings.len(),
            self.path.display()
        );
        Ok(())
    }
}
