//! trackbridge-replay - resend a CoT history journal
//!
//! Reads a journal written by the bridge and sends every entry to a CoT
//! target, preserving the original spacing scaled by `--speed`.

#[path = "../logging.rs"]
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tokio::time::{sleep_until, Instant};
use trackbridge_core::config::{LogFormat, LoggingConfig};
use trackbridge_cot::build_track;
use trackbridge_transport::{read_entries, CotSender, ReplayPlan, TransportMetrics};
use tracing::{debug, info};

/// Replay a CoT history journal over UDP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Journal file to replay
    journal: PathBuf,

    /// CoT destination address
    #[arg(long, default_value = "127.0.0.1")]
    target: Ipv4Addr,

    /// CoT destination port
    #[arg(long, default_value = "4242")]
    port: u16,

    /// Playback speed multiplier (2.0 plays twice as fast)
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// TTL for multicast targets
    #[arg(long, default_value = "1")]
    ttl: u32,

    /// Print what would be sent without sending
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&LoggingConfig {
        level: args.log_level.clone(),
        format: if args.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
    })?;

    let entries = read_entries(&args.journal)
        .await
        .with_context(|| format!("Failed to read journal: {:?}", args.journal))?;
    let plan = ReplayPlan::new(entries, args.speed).context("Invalid replay speed")?;

    if plan.is_empty() {
        info!(journal = ?args.journal, "Journal has no entries");
        return Ok(());
    }

    let target = SocketAddr::from((args.target, args.port));
    info!(
        entries = plan.len(),
        speed = plan.speed(),
        duration = ?plan.duration(),
        %target,
        "Replaying journal"
    );

    let metrics = TransportMetrics::new();
    let sender = if args.dry_run {
        None
    } else {
        Some(
            CotSender::bind(target, args.ttl, None, metrics.clone())
                .await
                .context("Failed to bind CoT sender")?,
        )
    };

    let start = Instant::now();
    for (offset, entry) in plan.schedule() {
        sleep_until(start + offset).await;

        match build_track(&entry.xml) {
            Ok(track) => info!(
                time = %entry.time,
                identity = %track.identity,
                label = %track.label(),
                lat = track.lat,
                lon = track.lon,
                "Replaying track"
            ),
            Err(e) => debug!(time = %entry.time, error = %e, "Replaying non-track event"),
        }

        if let Some(sender) = &sender {
            sender.send(&entry.xml).await;
        }
    }

    let metrics = metrics.snapshot();
    info!(
        sent = metrics.messages_sent,
        failures = metrics.send_failures,
        "Replay finished"
    );
    Ok(())
}
