//! Cursor on Target encoding for bridged DIS tracks
//!
//! This crate turns [`TrackRecord`](trackbridge_core::types::TrackRecord)s into
//! single-line CoT XML events, builds the heartbeat ping, and parses CoT back
//! into tracks for replay tooling.
//!
//! # Example
//!
//! ```rust
//! use trackbridge_core::types::{EntityIdentity, TrackRecord};
//! use trackbridge_cot::{build_track, CotEncoder};
//!
//! let record = TrackRecord::new(EntityIdentity::new(1, 2, 3), 38.89, -77.03, 10.0).unwrap();
//! let encoder = CotEncoder::new("TrackBridge", "TrackBridge");
//!
//! let xml = encoder.encode_track(&record).unwrap();
//! assert!(xml.contains(r#"uid="TrackBridge-1:2:3""#));
//!
//! let rebuilt = build_track(&xml).unwrap();
//! assert_eq!(rebuilt.identity, record.identity);
//! ```

pub mod builder;
pub mod event;
pub mod parser;
pub mod serializer;
pub mod validate;

pub use builder::{build_track, CotEncoder, PING_TYPE};
pub use event::{Contact, Detail, Event, Group, Point};
pub use parser::{parse_cot, parse_cot_bytes, ParseError};
pub use serializer::{serialize_event, timestamp};
pub use validate::{validate_event, validate_point, ValidationError};
