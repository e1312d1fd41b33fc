//! UDP transport for the DIS-to-CoT bridge
//!
//! - [`receiver::DisReceiver`] listens for Entity State PDUs (unicast or
//!   multicast), decodes them and merges them into the [`cache::TrackCache`].
//! - [`sender::CotSender`] sends CoT datagrams to a mutable target and journals
//!   them through [`history::HistoryWriter`].
//! - [`heartbeat::HeartbeatScheduler`] pings on a fixed interval.
//! - [`bridge::TrackBridge`] wires everything together.
//!
//! # Example
//!
//! ```no_run
//! use trackbridge_core::AppConfig;
//! use trackbridge_transport::TrackBridge;
//!
//! # async fn run() -> trackbridge_core::Result<()> {
//! let bridge = TrackBridge::new(AppConfig::default()).await?;
//! bridge.start().await?;
//!
//! let mut tracks = bridge.subscribe();
//! while let Ok(track) = tracks.recv().await {
//!     println!("{} at {:.5},{:.5}", track.label(), track.lat, track.lon);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod cache;
pub mod filter;
pub mod heartbeat;
pub mod history;
pub mod receiver;
pub mod sender;
pub mod state;

pub use bridge::TrackBridge;
pub use cache::TrackCache;
pub use filter::TrackFilter;
pub use heartbeat::HeartbeatScheduler;
pub use history::{read_entries, HistoryEntry, HistoryWriter, ReplayPlan};
pub use receiver::DisReceiver;
pub use sender::CotSender;
pub use state::{ListenerState, MetricsSnapshot, TransportMetrics};
