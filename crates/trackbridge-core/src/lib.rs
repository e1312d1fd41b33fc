//! # TrackBridge Core
//!
//! Core types, error handling, and configuration for the TrackBridge DIS-to-CoT bridge.
//!
//! This crate provides the foundational building blocks shared by every other crate:
//!
//! - **Types**: `EntityIdentity`, `TrackType`, `EntityDomain` and the canonical
//!   `TrackRecord` that flows from the PDU decoder through the track cache to the
//!   CoT encoder.
//! - **Errors**: error types using `thiserror` for transport, configuration and
//!   I/O failures. Every failure is isolated to a single packet, send or encode.
//! - **Configuration**: YAML files with environment variable overrides and
//!   validation.
//!
//! ## Example
//!
//! ```
//! use trackbridge_core::types::{EntityIdentity, TrackRecord};
//!
//! let identity = EntityIdentity::new(1, 3101, 42);
//! assert_eq!(identity.to_string(), "1:3101:42");
//!
//! let record = TrackRecord::new(identity, 36.5, -117.25, 120.0).unwrap();
//! assert!(record.custom_marking.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{Result, TrackBridgeError};
pub use types::{EntityDomain, EntityIdentity, TrackRecord, TrackType};
