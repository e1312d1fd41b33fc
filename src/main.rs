//! trackbridge - DIS Entity State to Cursor on Target bridge
//!
//! Listens for DIS Entity State PDUs, keeps the latest state of every entity,
//! and forwards each update as a CoT event over UDP, with a periodic heartbeat.

mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use trackbridge_core::config::{AppConfig, LogFormat};
use trackbridge_transport::TrackBridge;
use tracing::{debug, info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Bridge DIS entity traffic to TAK clients as CoT
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used if omitted and config/config.yaml is absent)
    #[arg(short, long, env = "TRACKBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// DIS listen address (multicast groups are joined)
    #[arg(long)]
    dis_ip: Option<String>,

    /// DIS listen port
    #[arg(long)]
    dis_port: Option<u16>,

    /// CoT destination address
    #[arg(long)]
    cot_ip: Option<String>,

    /// CoT destination port
    #[arg(long)]
    cot_port: Option<u16>,

    /// Seconds between heartbeat pings
    #[arg(long)]
    heartbeat_secs: Option<u64>,

    /// Disable the heartbeat ping
    #[arg(long)]
    no_heartbeat: bool,

    /// Do not journal sent CoT
    #[arg(long)]
    no_history: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_config_builder(path)
                .with_context(|| format!("Failed to load config file: {:?}", path))?,
            None if PathBuf::from(DEFAULT_CONFIG_PATH).exists() => {
                AppConfig::from_config_builder(DEFAULT_CONFIG_PATH)
                    .context("Failed to load default config file")?
            }
            None => AppConfig::default(),
        };

        if let Some(ip) = &self.dis_ip {
            config.dis.bind_ip = ip.clone();
        }
        if let Some(port) = self.dis_port {
            config.dis.port = port;
        }
        if let Some(ip) = &self.cot_ip {
            config.cot.target_ip = ip.clone();
        }
        if let Some(port) = self.cot_port {
            config.cot.port = port;
        }
        if let Some(secs) = self.heartbeat_secs {
            config.heartbeat.interval_secs = secs;
        }
        if self.no_heartbeat {
            config.heartbeat.enabled = false;
        }
        if self.no_history {
            config.history.enabled = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.format = LogFormat::Json;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;
    logging::init(&config.logging)?;

    info!(
        dis = %format!("{}:{}", config.dis.bind_ip, config.dis.port),
        cot = %format!("{}:{}", config.cot.target_ip, config.cot.port),
        heartbeat = config.heartbeat.enabled,
        history = config.history.enabled,
        "Starting TrackBridge"
    );

    let bridge = TrackBridge::new(config)
        .await
        .context("Failed to create bridge")?;

    let mut tracks = bridge.subscribe();
    let observer = tokio::spawn(async move {
        loop {
            match tracks.recv().await {
                Ok(track) => debug!(
                    identity = %track.identity,
                    label = %track.label(),
                    track_type = %track.track_type,
                    grid = %track.grid_ref,
                    "Track updated"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Track observer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    bridge.start().await.context("Failed to start bridge")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    bridge.shutdown();
    observer.abort();

    let metrics = bridge.metrics();
    info!(
        datagrams = metrics.datagrams_received,
        decode_failures = metrics.decode_failures,
        tracks = metrics.tracks_emitted,
        sent = metrics.messages_sent,
        send_failures = metrics.send_failures,
        cached = bridge.tracks().len(),
        "TrackBridge stopped"
    );

    Ok(())
}
