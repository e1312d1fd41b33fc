//! Outbound CoT sender
//!
//! Writes each CoT document as one UDP datagram to the current target and then
//! journals it. The target can be swapped at runtime without rebinding.

use crate::history::HistoryWriter;
use crate::state::TransportMetrics;
use chrono::Utc;
use parking_lot::RwLock;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, info, instrument, warn};
use trackbridge_core::config::CotConfig;
use trackbridge_core::error::{Result, TrackBridgeError, TransportError};

/// Maximum UDP payload that survives a 1500-byte MTU without fragmentation
const MAX_UDP_PACKET_SIZE: usize = 1472;

/// UDP sender for CoT messages
#[derive(Debug)]
pub struct CotSender {
    socket: UdpSocket,
    target: RwLock<SocketAddr>,
    history: Option<HistoryWriter>,
    metrics: TransportMetrics,
}

impl CotSender {
    /// Binds an ephemeral IPv4 socket and points it at `target`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for an IPv6 target.
    #[instrument(skip(history, metrics))]
    pub async fn bind(
        target: SocketAddr,
        multicast_ttl: u32,
        history: Option<HistoryWriter>,
        metrics: TransportMetrics,
    ) -> Result<Self> {
        ensure_ipv4(target)?;
        let local_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

        let socket = socket2::Socket::new(
            socket2::Domain::IPV4,
            socket2::Type::DGRAM,
            Some(socket2::Protocol::UDP),
        )
        .map_err(|e| TransportError::bind(local_addr, e))?;

        // Best-effort; unicast targets do not need it
        let _ = socket.set_multicast_ttl_v4(multicast_ttl);

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::bind(local_addr, e))?;
        socket
            .bind(&local_addr.into())
            .map_err(|e| TransportError::bind(local_addr, e))?;

        let socket = UdpSocket::from_std(socket.into())
            .map_err(|e| TransportError::bind(local_addr, e))?;

        info!(%target, "CoT sender ready");
        Ok(Self {
            socket,
            target: RwLock::new(target),
            history,
            metrics,
        })
    }

    /// Binds a sender from configuration.
    pub async fn from_config(
        config: &CotConfig,
        history: Option<HistoryWriter>,
        metrics: TransportMetrics,
    ) -> Result<Self> {
        let target = SocketAddr::new(IpAddr::V4(config.parse_ip()?), config.port);
        Self::bind(target, config.multicast_ttl, history, metrics).await
    }

    pub fn target(&self) -> SocketAddr {
        *self.target.read()
    }

    /// Swaps the destination for subsequent sends.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` unless `ip` is an IPv4 address.
    pub fn set_target(&self, ip: &str, port: u16) -> Result<()> {
        let ip: Ipv4Addr = ip
            .trim()
            .parse()
            .map_err(|_| TransportError::invalid_address(ip))?;
        self.set_target_addr(SocketAddr::new(IpAddr::V4(ip), port))
    }

    pub fn set_target_addr(&self, target: SocketAddr) -> Result<()> {
        ensure_ipv4(target)?;
        let previous = std::mem::replace(&mut *self.target.write(), target);
        info!(%previous, %target, "CoT target changed");
        Ok(())
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Sends a CoT document, logging and swallowing any failure.
    ///
    /// Returns true if the datagram left the socket.
    pub async fn send(&self, xml: &str) -> bool {
        match self.try_send(xml).await {
            Ok(_) => true,
            Err(TrackBridgeError::Transport(e @ TransportError::History { .. })) => {
                warn!(error = %e, "CoT sent but not journaled");
                true
            }
            Err(e) => {
                warn!(error = %e, "CoT send failed");
                false
            }
        }
    }

    /// Sends a CoT document and appends it to the history journal.
    ///
    /// The journal is only written after a successful send.
    pub async fn try_send(&self, xml: &str) -> Result<usize> {
        let target = self.target();
        let data = xml.as_bytes();

        if data.len() > MAX_UDP_PACKET_SIZE {
            warn!(
                size = data.len(),
                max_size = MAX_UDP_PACKET_SIZE,
                "CoT message exceeds recommended UDP size, may be fragmented or dropped"
            );
        }

        let sent = match self.socket.send_to(data, target).await {
            Ok(sent) => sent,
            Err(e) => {
                self.metrics.record_send_failure();
                return Err(TransportError::send(target, e).into());
            }
        };

        self.metrics.record_sent(sent as u64);
        debug!(%target, size = sent, "CoT sent");

        if let Some(history) = &self.history {
            history.append(xml, Utc::now()).await?;
        }

        Ok(sent)
    }
}

fn ensure_ipv4(target: SocketAddr) -> Result<()> {
    if target.is_ipv4() {
        Ok(())
    } else {
        Err(TransportError::invalid_address(target.to_string()).into())
    }
}
