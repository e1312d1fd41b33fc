//! # TrackBridge DIS
//!
//! Decoding of DIS Entity State PDUs into track records.
//!
//! - [`pdu`]: header validation and bounds-checked field extraction
//! - [`geodesy`]: WGS84 ECEF/geodetic conversion
//! - [`mgrs`]: military grid references (UTM and polar UPS)
//! - [`symbology`]: affiliation, symbol, country and platform tables
//!
//! ## Example
//!
//! ```
//! use trackbridge_core::types::EntityIdentity;
//! use trackbridge_dis::geodesy::geodetic_to_ecef;
//! use trackbridge_dis::pdu::{decode, EntityStatePdu};
//!
//! let pdu = EntityStatePdu {
//!     version: 7,
//!     force_id: 1,
//!     identity: EntityIdentity::new(1, 1, 7),
//!     kind: 1,
//!     domain: 1,
//!     country: 225,
//!     category: 2,
//!     location: geodetic_to_ecef(38.8977, -77.0365, 50.0),
//!     marking: Some("Truck7".to_string()),
//! };
//!
//! let record = decode(&pdu.encode()).unwrap();
//! assert_eq!(record.platform_type, "Truck");
//! assert_eq!(record.custom_marking, "Truck7");
//! ```

pub mod geodesy;
pub mod mgrs;
pub mod pdu;
pub mod symbology;

pub use geodesy::{ecef_to_geodetic, geodetic_to_ecef};
pub use mgrs::{geodetic_to_grid, geodetic_to_grid_with_precision};
pub use pdu::{decode, DecodeError, EntityStatePdu};
