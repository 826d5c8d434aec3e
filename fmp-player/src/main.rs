//! FM Player (fmp-player) - Main entry point
//!
//! Loads the bootstrap config, connects to the shared store, then runs the
//! command and queue loops (plus the optional status API) until a shutdown
//! signal arrives.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use fmp_common::config::{LoggingConfig, StoreBackend};
use fmp_common::EventBus;
use fmp_player::api::{self, AppState};
use fmp_player::config::{self, ConfigOverrides};
use fmp_player::mixer::{MixerCapability, SoftwareMixer};
use fmp_player::playback::{PlaybackCapability, SimulatedEngine};
use fmp_player::player::LoopExit;
use fmp_player::{store, Player};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for fmp-player
#[derive(Parser, Debug)]
#[command(name = "fmp-player")]
#[command(about = "Queue-driven FM player orchestrator")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "FM_PLAYER_CONFIG")]
    config: Option<PathBuf>,

    /// Shared store backend (memory, redis)
    #[arg(long, env = "FM_PLAYER_STORE")]
    store: Option<StoreBackend>,

    /// Shared store URL
    #[arg(long, env = "FM_PLAYER_STORE_URL")]
    store_url: Option<String>,

    /// Channel used for both commands and notifications
    #[arg(long, env = "FM_PLAYER_CHANNEL")]
    channel: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FM_PLAYER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, env = "FM_PLAYER_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Status API bind address
    #[arg(long, env = "FM_PLAYER_HTTP_BIND")]
    http_bind: Option<String>,

    /// Do not start the status API
    #[arg(long)]
    no_http: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            store_backend: self.store,
            store_url: self.store_url.clone(),
            channel: self.channel.clone(),
            log_level: self.log_level.clone(),
            log_file: self.log_file.clone(),
            http_bind: self.http_bind.clone(),
            disable_http: self.no_http,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = config::load(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    info!(
        "Starting FM Player v{} (store: {}, commands: '{}', notifications: '{}')",
        env!("CARGO_PKG_VERSION"),
        config.store.backend,
        config.channels.command,
        config.channels.notification
    );

    let store = store::connect(&config.store)
        .await
        .context("Failed to connect to shared store")?;
    store
        .ping()
        .await
        .context("Shared store did not answer ping")?;
    info!("Shared store is reachable");

    let engine: Arc<dyn PlaybackCapability> =
        Arc::new(SimulatedEngine::new(config.track_duration()));
    let mixer: Arc<dyn MixerCapability> = Arc::new(
        SoftwareMixer::new(config.mixer.min_volume, config.mixer.max_volume)
            .context("Failed to initialize mixer")?,
    );

    warn!(
        "Run exactly one player per queue ('{}'); a second consumer would interleave tracks",
        config.keys.queue
    );

    let player = Player::new(
        &config,
        store,
        Arc::clone(&engine),
        Arc::clone(&mixer),
        EventBus::new(100),
    );
    if config.mixer.apply_initial_state {
        player
            .apply_initial_state(config.mixer.initial_volume, config.mixer.initial_mute)
            .await;
    }

    let mut handle = player
        .start()
        .await
        .context("Failed to subscribe to command channel")?;

    let http = if config.http.enabled {
        let state = AppState::new(player.publisher().clone(), engine, mixer);
        let bind = config.http.bind.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = api::serve(&bind, state).await {
                error!("Status API stopped: {}", e);
            }
        }))
    } else {
        info!("Status API disabled");
        None
    };

    tokio::select! {
        _ = shutdown_signal() => {}
        exit = handle.join() => match exit {
            LoopExit::Commands => error!("Command loop exited unexpectedly"),
            LoopExit::Queue => error!("Queue loop exited unexpectedly"),
        },
    }

    if let Some(http) = http {
        http.abort();
    }
    handle.shutdown().await;
    info!("FM Player shutdown complete");
    Ok(())
}

/// Stderr logging, plus an optional plain-text log file
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fmp_player={level},fmp_common={level},tower_http=info",
            level = logging.level
        ))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
