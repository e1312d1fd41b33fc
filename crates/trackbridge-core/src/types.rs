//! Core data types for the DIS-to-CoT pipeline.
//!
//! `TrackRecord` is the canonical unit: the PDU decoder creates one per valid
//! datagram, the track cache merges it per `EntityIdentity`, and the CoT encoder
//! serializes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Composite simulation identity `(site, application, entity)`.
///
/// Unique per simulated object and immutable once derived from a PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EntityIdentity {
    pub site: u16,
    pub application: u16,
    pub entity: u16,
}

impl EntityIdentity {
    /// Creates a new identity.
    pub const fn new(site: u16, application: u16, entity: u16) -> Self {
        Self {
            site,
            application,
            entity,
        }
    }

    /// Integer hash of the identity string, used as a display id.
    ///
    /// FNV-1a over `"site:app:entity"` so the value is stable across runs.
    pub fn display_id(&self) -> i32 {
        let mut hash: u32 = 0x811c_9dc5;
        for byte in self.to_string().bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        }
        hash as i32
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.site, self.application, self.entity)
    }
}

/// Error returned when parsing an identity string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid entity identity: {0} (expected site:application:entity)")]
pub struct IdentityParseError(pub String);

impl FromStr for EntityIdentity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let mut next = || -> Result<u16, IdentityParseError> {
            parts
                .next()
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(|| IdentityParseError(s.to_string()))
        };

        let identity = EntityIdentity::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(IdentityParseError(s.to_string()));
        }
        Ok(identity)
    }
}

/// Affiliation classification of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackType {
    Friendly,
    Enemy,
    #[default]
    Unknown,
    Neutral,
}

impl TrackType {
    /// Single-letter CoT affiliation code (`f`, `h`, `u`, `n`).
    pub const fn cot_code(&self) -> char {
        match self {
            TrackType::Friendly => 'f',
            TrackType::Enemy => 'h',
            TrackType::Unknown => 'u',
            TrackType::Neutral => 'n',
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackType::Friendly => write!(f, "Friendly"),
            TrackType::Enemy => write!(f, "Enemy"),
            TrackType::Unknown => write!(f, "Unknown"),
            TrackType::Neutral => write!(f, "Neutral"),
        }
    }
}

impl FromStr for TrackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "friendly" | "friend" => Ok(TrackType::Friendly),
            "enemy" | "hostile" => Ok(TrackType::Enemy),
            "unknown" => Ok(TrackType::Unknown),
            "neutral" => Ok(TrackType::Neutral),
            other => Err(format!("Unknown track type: {}", other)),
        }
    }
}

/// DIS entity domain byte, as far as the bridge distinguishes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityDomain {
    Land,
    Air,
    Surface,
    Other(u8),
}

impl EntityDomain {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => EntityDomain::Land,
            2 => EntityDomain::Air,
            3 => EntityDomain::Surface,
            other => EntityDomain::Other(other),
        }
    }

    /// CoT dimension letter, if the domain maps to one.
    pub const fn cot_dimension(&self) -> Option<char> {
        match self {
            EntityDomain::Land => Some('G'),
            EntityDomain::Air => Some('A'),
            EntityDomain::Surface => Some('S'),
            EntityDomain::Other(_) => None,
        }
    }

    /// Group role used in the CoT `group` detail.
    pub const fn role(&self) -> &'static str {
        match self {
            EntityDomain::Land => "ground",
            EntityDomain::Air => "air",
            EntityDomain::Surface => "sea",
            EntityDomain::Other(_) => "unknown",
        }
    }
}

impl From<u8> for EntityDomain {
    fn from(value: u8) -> Self {
        EntityDomain::from_u8(value)
    }
}

/// Error returned when a position falls outside the geodetic range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Coordinates out of range: lat={lat}, lon={lon}")]
pub struct CoordinateError {
    pub lat: f64,
    pub lon: f64,
}

/// Returns true if `lat`/`lon` lie within [-90, 90] / [-180, 180].
pub fn is_valid_position(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Most recently observed state of one simulated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Simulation identity (cache key)
    pub identity: EntityIdentity,
    /// Integer display id derived from the identity
    pub display_id: i32,
    /// Latitude in decimal degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub lon: f64,
    /// Height above the WGS84 ellipsoid in meters
    pub alt: f64,
    pub track_type: TrackType,
    /// Raw DIS entity kind byte
    pub entity_kind: u8,
    /// Raw DIS domain byte
    pub domain: u8,
    /// Raw DIS category byte
    pub category: u8,
    /// Three-letter country code, or "Other"/"Unknown"
    pub country_code: String,
    /// 15-character MIL-STD-2525 symbol code
    pub symbol_id: String,
    /// Coarse platform label (Tank, Truck, ...)
    pub platform_type: String,
    /// Display label; empty until the cache applies the identity fallback
    pub custom_marking: String,
    /// When true, inbound markings never overwrite `custom_marking`
    pub marking_locked: bool,
    /// When false, the track is cached but never sent as CoT
    pub publish: bool,
    pub last_update: DateTime<Utc>,
    /// Military grid reference of the current position
    pub grid_ref: String,
}

impl TrackRecord {
    /// Creates a record at the given position with every other field defaulted.
    ///
    /// # Errors
    ///
    /// Returns `CoordinateError` if the position is out of range; such a record
    /// is never constructed.
    pub fn new(
        identity: EntityIdentity,
        lat: f64,
        lon: f64,
        alt: f64,
    ) -> std::result::Result<Self, CoordinateError> {
        if !is_valid_position(lat, lon) {
            return Err(CoordinateError { lat, lon });
        }

        Ok(Self {
            identity,
            display_id: identity.display_id(),
            lat,
            lon,
            alt,
            track_type: TrackType::Unknown,
            entity_kind: 0,
            domain: 0,
            category: 0,
            country_code: String::new(),
            symbol_id: String::new(),
            platform_type: "Unknown".to_string(),
            custom_marking: String::new(),
            marking_locked: false,
            publish: true,
            last_update: Utc::now(),
            grid_ref: String::new(),
        })
    }

    /// Domain classification of the raw domain byte.
    pub fn entity_domain(&self) -> EntityDomain {
        EntityDomain::from_u8(self.domain)
    }

    /// True if the stored position lies within the geodetic range.
    pub fn has_valid_position(&self) -> bool {
        is_valid_position(self.lat, self.lon)
    }

    /// Callsign to display: the marking, or the identity string when unset.
    pub fn label(&self) -> String {
        if self.custom_marking.trim().is_empty() {
            self.identity.to_string()
        } else {
            self.custom_marking.clone()
        }
    }
}
