//! Periodic heartbeat ping
//!
//! A cancellable tokio task sends the ping once per interval, independent of
//! entity traffic. Changing the interval restarts the task; the previous task
//! is cancelled before the new one is spawned.

use crate::sender::CotSender;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use trackbridge_core::error::{Result, TransportError};
use trackbridge_cot::CotEncoder;

/// Default interval between pings
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

struct Running {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Sends the heartbeat ping on a fixed, adjustable interval.
pub struct HeartbeatScheduler {
    encoder: CotEncoder,
    sender: Arc<CotSender>,
    interval: Mutex<Duration>,
    running: Mutex<Option<Running>>,
}

impl HeartbeatScheduler {
    pub fn new(encoder: CotEncoder, sender: Arc<CotSender>) -> Self {
        Self {
            encoder,
            sender,
            interval: Mutex::new(DEFAULT_INTERVAL),
            running: Mutex::new(None),
        }
    }

    /// Sets the initial interval.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInterval` for a zero duration.
    pub fn with_interval(self, interval: Duration) -> Result<Self> {
        validate(interval)?;
        *self.interval.lock() = interval;
        Ok(self)
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .map(|r| !r.task.is_finished())
            .unwrap_or(false)
    }

    /// Starts (or restarts) the ping task. The first ping is sent immediately.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self), fields(interval = ?self.interval()))]
    pub fn start(&self) {
        let mut running = self.running.lock();
        if let Some(previous) = running.take() {
            previous.token.cancel();
        }

        let token = CancellationToken::new();
        let task = tokio::spawn(ping_loop(
            self.encoder.clone(),
            Arc::clone(&self.sender),
            self.interval(),
            token.clone(),
        ));

        *running = Some(Running { token, task });
        info!("Heartbeat started");
    }

    /// Stops the ping task. Idempotent.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            running.token.cancel();
            info!("Heartbeat stopped");
        }
    }

    /// Changes the interval, restarting the task if it is running.
    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        validate(interval)?;
        *self.interval.lock() = interval;
        debug!(?interval, "Heartbeat interval updated");

        if self.is_running() {
            self.start();
        }
        Ok(())
    }

    pub fn set_interval_seconds(&self, seconds: u64) -> Result<()> {
        self.set_interval(Duration::from_secs(seconds))
    }

    /// Sends one ping right away, outside the schedule.
    pub async fn ping_now(&self) -> bool {
        send_ping(&self.encoder, &self.sender).await
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn validate(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(TransportError::InvalidInterval {
            seconds: interval.as_secs(),
        }
        .into());
    }
    Ok(())
}

async fn ping_loop(
    encoder: CotEncoder,
    sender: Arc<CotSender>,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Heartbeat task shutting down");
                break;
            }
            _ = ticker.tick() => {
                send_ping(&encoder, &sender).await;
            }
        }
    }
}

async fn send_ping(encoder: &CotEncoder, sender: &CotSender) -> bool {
    match encoder.encode_ping() {
        Some(xml) => sender.send(&xml).await,
        None => {
            error!("Heartbeat ping could not be encoded");
            false
        }
    }
}
