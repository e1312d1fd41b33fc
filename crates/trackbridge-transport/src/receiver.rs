//! DIS listener loop
//!
//! One receive task per active listener. Each datagram is decoded, merged into
//! the track cache and broadcast to subscribers. Malformed datagrams are
//! counted and dropped; nothing stops the loop except `stop()`.

use crate::cache::TrackCache;
use crate::state::{ListenerState, TransportMetrics};
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use trackbridge_core::error::{Result, TransportError};
use trackbridge_core::types::TrackRecord;
use trackbridge_dis::pdu::decode;

/// Capacity of the track broadcast channel
const TRACK_CHANNEL_CAPACITY: usize = 1024;

/// Largest datagram the loop will read
const MAX_DATAGRAM_SIZE: usize = 65_507;

struct Listener {
    token: CancellationToken,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Receives Entity State PDUs and publishes decoded tracks.
pub struct DisReceiver {
    cache: Arc<TrackCache>,
    metrics: TransportMetrics,
    tracks_tx: broadcast::Sender<TrackRecord>,
    recv_buffer_size: usize,
    listener: Mutex<Option<Listener>>,
}

impl DisReceiver {
    pub fn new(cache: Arc<TrackCache>, metrics: TransportMetrics) -> Self {
        let (tracks_tx, _) = broadcast::channel(TRACK_CHANNEL_CAPACITY);
        Self {
            cache,
            metrics,
            tracks_tx,
            recv_buffer_size: 65_536,
            listener: Mutex::new(None),
        }
    }

    /// Sets the kernel receive buffer requested for new sockets.
    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Subscribes to every track the loop emits.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackRecord> {
        self.tracks_tx.subscribe()
    }

    pub fn cache(&self) -> &Arc<TrackCache> {
        &self.cache
    }

    pub fn state(&self) -> ListenerState {
        match &*self.listener.lock() {
            Some(listener) if !listener.task.is_finished() => ListenerState::Listening,
            _ => ListenerState::Stopped,
        }
    }

    /// Address of the bound socket, if listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().as_ref().map(|l| l.local_addr)
    }

    /// Opens a socket on `port` and starts the receive loop.
    ///
    /// Any previous loop is stopped and awaited first, so its socket is closed
    /// before the new one binds. If `bind_ip` is a multicast group
    /// the socket joins it. Port 0 picks an ephemeral port; the bound
    /// address is returned.
    #[instrument(skip(self))]
    pub async fn start(&self, bind_ip: &str, port: u16) -> Result<SocketAddr> {
        let previous = self.listener.lock().take();
        if let Some(listener) = previous {
            listener.token.cancel();
            listener.task.abort();
            let _ = listener.task.await;
            info!(local_addr = %listener.local_addr, "DIS listener replaced");
        }

        let ip: Ipv4Addr = bind_ip
            .trim()
            .parse()
            .map_err(|_| TransportError::invalid_address(bind_ip))?;

        let socket = self.open_socket(ip, port)?;
        let local_addr = socket.local_addr()?;

        let token = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            socket,
            token.clone(),
            Arc::clone(&self.cache),
            self.metrics.clone(),
            self.tracks_tx.clone(),
        ));

        *self.listener.lock() = Some(Listener {
            token,
            task,
            local_addr,
        });

        info!(%ip, %local_addr, "DIS listener started");
        Ok(local_addr)
    }

    /// Cancels the receive loop and releases its socket.
    ///
    /// The task is aborted as well as cancelled so the socket is dropped on the
    /// runtime's next pass rather than whenever the loop next polls. Idempotent
    /// and callable from any thread.
    pub fn stop(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.token.cancel();
            listener.task.abort();
            info!(local_addr = %listener.local_addr, "DIS listener stopped");
        }
    }

    fn open_socket(&self, ip: Ipv4Addr, port: u16) -> Result<UdpSocket> {
        let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);

        let socket = socket2::Socket::new(
            socket2::Domain::IPV4,
            socket2::Type::DGRAM,
            Some(socket2::Protocol::UDP),
        )
        .map_err(|e| TransportError::bind(bind_addr, e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::bind(bind_addr, e))?;

        // Best-effort, ignore errors
        let _ = socket.set_recv_buffer_size(self.recv_buffer_size);

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::bind(bind_addr, e))?;
        socket
            .bind(&bind_addr.into())
            .map_err(|e| TransportError::bind(bind_addr, e))?;

        if ip.is_multicast() {
            socket
                .join_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED)
                .map_err(|e| TransportError::Multicast {
                    group: ip.to_string(),
                    reason: e.to_string(),
                })?;
            info!(group = %ip, "Joined multicast group");
        }

        UdpSocket::from_std(socket.into()).map_err(|e| TransportError::bind(bind_addr, e).into())
    }
}

impl Drop for DisReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn receive_loop(
    socket: UdpSocket,
    token: CancellationToken,
    cache: Arc<TrackCache>,
    metrics: TransportMetrics,
    tracks_tx: broadcast::Sender<TrackRecord>,
) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("DIS receive loop shutting down");
                break;
            }
            result = socket.recv_from(&mut buffer) => {
                match result {
                    Ok((size, source)) => {
                        handle_datagram(&buffer[..size], source, &cache, &metrics, &tracks_tx);
                    }
                    Err(e) => {
                        if token.is_cancelled() {
                            break;
                        }
                        warn!(error = %e, "DIS receive error");
                    }
                }
            }
        }
    }
}

fn handle_datagram(
    data: &[u8],
    source: SocketAddr,
    cache: &TrackCache,
    metrics: &TransportMetrics,
    tracks_tx: &broadcast::Sender<TrackRecord>,
) {
    metrics.record_datagram(data.len() as u64);

    match decode(data) {
        Ok(candidate) => {
            let record = cache.upsert(candidate);
            metrics.record_track();
            debug!(
                identity = %record.identity,
                %source,
                lat = record.lat,
                lon = record.lon,
                "Entity observed"
            );
            // No subscribers is fine
            let _ = tracks_tx.send(record);
        }
        Err(e) => {
            metrics.record_decode_failure();
            debug!(%source, len = data.len(), error = %e, "Dropping datagram");
        }
    }
}
