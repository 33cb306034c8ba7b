//! Config hot reload
//!
//! The parent directory is watched rather than the file itself: editors that
//! save atomically write a temp file and rename it over the config, which
//! replaces the inode a file watch would be attached to. Events are filtered
//! down to the config's file name and a burst of them yields one reload.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Quiet period after the first change before the file is re-read
const SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Yields a freshly parsed [`AppConfig`] each time the file changes
///
/// Invalid edits are logged and skipped; the previous config stays in effect.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Load `config_path` and start watching it
    pub async fn new(config_path: impl Into<PathBuf>) -> Result<(Self, Arc<AppConfig>)> {
        let config_path = config_path.into();

        let initial = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        let file_name: OsString = config_path
            .file_name()
            .with_context(|| format!("Config path has no file name: {}", config_path.display()))?
            .to_os_string();
        let dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // notify calls back on its own thread; only a wake-up crosses over
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &file_name) => {
                debug!("Config event {:?} on {:?}", event.kind, event.paths);
                let _ = change_tx.send(());
            },
            Ok(_) => {},
            Err(e) => error!("Config watch error: {}", e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", dir.display()))?;

        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(reload_loop(config_path.clone(), change_rx, tx));

        info!("Watching {} for changes", config_path.display());

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            Arc::new(initial),
        ))
    }

    /// Wait for the next valid config; `None` once the watcher is gone
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}

/// Whether `event` writes, creates or renames onto the config file
fn touches(event: &Event, file_name: &OsStr) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name))
}

async fn reload_loop(
    path: PathBuf,
    mut changes: mpsc::UnboundedReceiver<()>,
    tx: mpsc::Sender<AppConfig>,
) {
    while changes.recv().await.is_some() {
        tokio::time::sleep(SETTLE_DELAY).await;
        while changes.try_recv().is_ok() {}

        match AppConfig::load(&path).await {
            Ok(config) => {
                info!("Configuration reloaded from {}", path.display());
                if tx.send(config).await.is_err() {
                    break;
                }
            },
            Err(e) => warn!("Ignoring invalid config edit: {:#}", e),
        }
    }
    debug!("Config reload loop for {} stopped", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const WITH_DIGIMON: &str = r#"
resolver:
  sources:
    digimon:
      url: "http://localhost:9000/digimon"
      field: /name
"#;

    const WITH_TEMTEM: &str = r#"
resolver:
  sources:
    temtem:
      url: "http://localhost:9000/temtems"
      field: /name
"#;

    async fn next_reload(watcher: &mut ConfigWatcher) -> AppConfig {
        tokio::time::timeout(Duration::from_secs(5), watcher.next_config())
            .await
            .expect("no reload within 5s")
            .expect("watcher closed")
    }

    async fn start(dir: &TempDir) -> (ConfigWatcher, PathBuf) {
        let path = dir.path().join("overlay.yaml");
        fs::write(&path, WITH_DIGIMON).unwrap();

        let (watcher, initial) = ConfigWatcher::new(path.clone()).await.unwrap();
        assert!(initial.resolver.sources.contains_key("digimon"));

        // Let the backend settle before the first edit
        tokio::time::sleep(Duration::from_millis(100)).await;
        (watcher, path)
    }

    #[tokio::test]
    async fn test_in_place_write_reloads() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, path) = start(&dir).await;

        fs::write(&path, WITH_TEMTEM).unwrap();

        let config = next_reload(&mut watcher).await;
        assert!(config.resolver.sources.contains_key("temtem"));
        assert!(!config.resolver.sources.contains_key("digimon"));
    }

    #[tokio::test]
    async fn test_atomic_rename_reloads() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, path) = start(&dir).await;

        let temp_file = dir.path().join(".overlay.yaml.swp");
        fs::write(&temp_file, WITH_TEMTEM).unwrap();
        fs::rename(&temp_file, &path).unwrap();

        let config = next_reload(&mut watcher).await;
        assert!(config.resolver.sources.contains_key("temtem"));

        // The watch survives the inode swap
        fs::write(&path, WITH_DIGIMON).unwrap();
        let config = next_reload(&mut watcher).await;
        assert!(config.resolver.sources.contains_key("digimon"));
    }

    #[tokio::test]
    async fn test_other_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, _path) = start(&dir).await;

        fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();

        let result = tokio::time::timeout(Duration::from_millis(600), watcher.next_config()).await;
        assert!(result.is_err(), "reloaded on an unrelated file");
    }

    #[tokio::test]
    async fn test_invalid_edit_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, path) = start(&dir).await;

        fs::write(&path, "server:\n  keep_alive_secs: 0\n").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        fs::write(&path, WITH_TEMTEM).unwrap();

        let config = next_reload(&mut watcher).await;
        assert!(config.resolver.sources.contains_key("temtem"));
    }
}
