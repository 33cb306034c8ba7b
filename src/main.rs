//! Overlay Hub
//!
//! Serves the shared overlay state to display clients and accepts control
//! commands over HTTP.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use overlay_hub::api::{self, ApiState};
use overlay_hub::config::{AppConfig, ConfigWatcher};
use overlay_hub::providers::ProviderStore;
use overlay_hub::resolver::HttpNameResolver;
use overlay_hub::{OverlayHub, StateStore};

/// Overlay Hub - push a shared overlay state to stream overlays
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "OVERLAY_CONFIG", default_value = "config.yaml")]
    config: String,

    /// Address to bind (overrides server.host)
    #[arg(long, env = "OVERLAY_HOST")]
    host: Option<String>,

    /// Port to bind (overrides server.port)
    #[arg(short, long, env = "OVERLAY_PORT")]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting Overlay Hub v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration; hot reload only when there is a file to watch
    let (config_watcher, mut config) = if Path::new(&args.config).exists() {
        info!("Configuration file: {}", args.config);
        let (watcher, initial) = ConfigWatcher::new(args.config.clone()).await?;
        (Some(watcher), (*initial).clone())
    } else {
        info!("No config file at {}, using defaults", args.config);
        (None, AppConfig::default())
    };

    // Reloads are compared against the file, not the CLI overrides
    let file_config = config.clone();

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = StateStore::new(
        config.overlay.initial_state(),
        config.overlay.shiny_mode.clone(),
    );
    let hub = Arc::new(OverlayHub::new(store));
    info!("Initial state: {:?}", hub.snapshot());

    let resolver = Arc::new(HttpNameResolver::new(
        config.resolver.timeout(),
        &config.resolver.user_agent,
        config.resolver.sources.clone(),
    )?);

    let providers = Arc::new(ProviderStore::new(&config.providers.path));
    info!("Provider settings: {}", providers.path().display());

    let state = Arc::new(ApiState {
        hub,
        resolver: resolver.clone(),
        providers,
        keep_alive: config.server.keep_alive(),
    });

    if let Some(watcher) = config_watcher {
        tokio::spawn(watch_config(watcher, resolver, file_config));
    }

    api::start_server(state, &config.server.host, config.server.port, shutdown_signal()).await?;

    info!("Overlay Hub shutdown complete");
    Ok(())
}

/// Apply config reloads; only the name source table is swapped live
async fn watch_config(
    mut watcher: ConfigWatcher,
    resolver: Arc<HttpNameResolver>,
    mut current: AppConfig,
) {
    while let Some(new_config) = watcher.next_config().await {
        info!("📝 Configuration file changed, reloading...");

        resolver.replace_sources(new_config.resolver.sources.clone());

        if new_config.server.host != current.server.host
            || new_config.server.port != current.server.port
            || new_config.server.keep_alive_secs != current.server.keep_alive_secs
            || new_config.overlay.mode != current.overlay.mode
            || new_config.overlay.name != current.overlay.name
            || new_config.overlay.shiny_mode != current.overlay.shiny_mode
            || new_config.providers.path != current.providers.path
            || new_config.resolver.timeout_ms != current.resolver.timeout_ms
            || new_config.resolver.user_agent != current.resolver.user_agent
        {
            warn!("⚠️  Some changed settings only take effect after a restart");
        }

        current = new_config;
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
