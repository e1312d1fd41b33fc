//! Bridge facade wiring the receiver, cache, encoder, sender and heartbeat.
//!
//! This is the surface collaborators (a UI, the daemon binary, replay
//! tooling) drive. Every decoded track is broadcast to subscribers and, if it
//! passes the forwarding filter, encoded and sent as CoT.

use crate::cache::TrackCache;
use crate::filter::TrackFilter;
use crate::heartbeat::HeartbeatScheduler;
use crate::history::HistoryWriter;
use crate::receiver::DisReceiver;
use crate::sender::CotSender;
use crate::state::{ListenerState, MetricsSnapshot, TransportMetrics};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trackbridge_core::config::AppConfig;
use trackbridge_core::error::Result;
use trackbridge_core::types::{EntityIdentity, TrackRecord};
use trackbridge_cot::{CotEncoder, ParseError};

/// DIS-to-CoT bridge
pub struct TrackBridge {
    config: AppConfig,
    cache: Arc<TrackCache>,
    encoder: CotEncoder,
    sender: Arc<CotSender>,
    receiver: DisReceiver,
    heartbeat: HeartbeatScheduler,
    metrics: TransportMetrics,
    forwarder: CancellationToken,
}

impl TrackBridge {
    /// Builds the bridge and binds the CoT sender. Nothing listens until
    /// [`TrackBridge::start`] or [`TrackBridge::start_listening`].
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, an unopenable history journal, or a
    /// sender socket that cannot be bound.
    pub async fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let metrics = TransportMetrics::new();
        let history = if config.history.enabled {
            Some(HistoryWriter::open(&config.history.path).await?)
        } else {
            None
        };

        let sender = Arc::new(CotSender::from_config(&config.cot, history, metrics.clone()).await?);
        let encoder = CotEncoder::from_config(&config.cot);
        let cache = Arc::new(TrackCache::new());
        let receiver = DisReceiver::new(Arc::clone(&cache), metrics.clone())
            .with_recv_buffer_size(config.dis.recv_buffer_size);
        let heartbeat = HeartbeatScheduler::new(encoder.clone(), Arc::clone(&sender))
            .with_interval(config.heartbeat.interval())?;

        let forwarder = CancellationToken::new();
        tokio::spawn(forward_tracks(
            receiver.subscribe(),
            TrackFilter::from_config(&config.filter),
            encoder.clone(),
            Arc::clone(&sender),
            forwarder.clone(),
        ));

        Ok(Self {
            config,
            cache,
            encoder,
            sender,
            receiver,
            heartbeat,
            metrics,
            forwarder,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Listens on the configured DIS address and starts the heartbeat if
    /// enabled.
    pub async fn start(&self) -> Result<SocketAddr> {
        let addr = self
            .start_listening(&self.config.dis.bind_ip, self.config.dis.port)
            .await?;

        if self.config.heartbeat.enabled {
            self.heartbeat.start();
        }

        info!(dis = %addr, cot = %self.sender.target(), "Bridge started");
        Ok(addr)
    }

    /// Starts (or restarts) the DIS listener.
    pub async fn start_listening(&self, ip: &str, port: u16) -> Result<SocketAddr> {
        self.receiver.start(ip, port).await
    }

    pub fn stop_listening(&self) {
        self.receiver.stop();
    }

    pub fn listener_state(&self) -> ListenerState {
        self.receiver.state()
    }

    /// Receives every track as it is observed, published or not.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackRecord> {
        self.receiver.subscribe()
    }

    /// Parses CoT XML back into a track.
    pub fn build_track(&self, xml: &str) -> std::result::Result<TrackRecord, ParseError> {
        self.encoder.build_track(xml)
    }

    /// Sends raw CoT through the bridge's sender. Failures are logged.
    pub async fn send(&self, xml: &str) -> bool {
        self.sender.send(xml).await
    }

    /// Encodes and sends a single track, bypassing the filter.
    pub async fn send_track(&self, record: &TrackRecord) -> bool {
        match self.encoder.encode_track(record) {
            Some(xml) => self.sender.send(&xml).await,
            None => false,
        }
    }

    pub fn set_target(&self, ip: &str, port: u16) -> Result<()> {
        self.sender.set_target(ip, port)
    }

    pub fn target(&self) -> SocketAddr {
        self.sender.target()
    }

    pub fn set_lock(
        &self,
        identity: EntityIdentity,
        marking: &str,
        locked: bool,
    ) -> Option<TrackRecord> {
        self.cache.set_lock(identity, marking, locked)
    }

    pub fn set_publish(&self, identity: EntityIdentity, publish: bool) -> Option<TrackRecord> {
        self.cache.set_publish(identity, publish)
    }

    pub fn start_heartbeat(&self) {
        self.heartbeat.start();
    }

    pub fn stop_heartbeat(&self) {
        self.heartbeat.stop();
    }

    pub fn set_heartbeat_interval_seconds(&self, seconds: u64) -> Result<()> {
        self.heartbeat.set_interval_seconds(seconds)
    }

    pub fn heartbeat(&self) -> &HeartbeatScheduler {
        &self.heartbeat
    }

    pub fn cache(&self) -> &TrackCache {
        &self.cache
    }

    /// All cached tracks, ordered by identity.
    pub fn tracks(&self) -> Vec<TrackRecord> {
        self.cache.snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stops the listener, the heartbeat and the forwarding task.
    pub fn shutdown(&self) {
        self.receiver.stop();
        self.heartbeat.stop();
        self.forwarder.cancel();
    }
}

impl Drop for TrackBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn forward_tracks(
    mut tracks: broadcast::Receiver<TrackRecord>,
    filter: TrackFilter,
    encoder: CotEncoder,
    sender: Arc<CotSender>,
    token: CancellationToken,
) {
    loop {
        let record = tokio::select! {
            _ = token.cancelled() => break,
            received = tracks.recv() => match received {
                Ok(record) => record,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Forwarder lagged, tracks not sent");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        if !filter.matches(&record) {
            debug!(identity = %record.identity, "Track filtered");
            continue;
        }

        if let Some(xml) = encoder.encode_track(&record) {
            sender.send(&xml).await;
        }
    }

    debug!("Track forwarder stopped");
}
