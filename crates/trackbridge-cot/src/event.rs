//! CoT event structures for bridged DIS tracks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trackbridge_core::types::{EntityDomain, TrackType};

/// Circular/linear error advertised for decoded tracks, in meters.
pub const TRACK_ERROR_M: f64 = 10.0;

/// Circular/linear error meaning "position unknown".
pub const UNKNOWN_ERROR_M: f64 = 9999999.0;

/// CoT Event represents a Cursor on Target message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// CoT version (always "2.0" for generated events)
    pub version: String,
    /// Unique identifier for this event
    pub uid: String,
    /// CoT type (e.g., "a-f-G" for atom-friendly-ground)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event timestamp
    pub time: DateTime<Utc>,
    /// Event start time
    pub start: DateTime<Utc>,
    /// Event stale time (when the event becomes invalid)
    pub stale: DateTime<Utc>,
    /// How the event was generated ("m-g" for machine-generated)
    pub how: String,
    /// Geographic location and accuracy
    pub point: Point,
    /// Optional structured detail section
    pub detail: Option<Detail>,
}

/// Geographic point with accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in decimal degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub lon: f64,
    /// Height above ellipsoid in meters
    pub hae: f64,
    /// Circular error in meters
    pub ce: f64,
    /// Linear error in meters
    pub le: f64,
}

/// Detail section carried by bridged tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Detail {
    /// MIL-STD-2525 symbol code (`<symbol symbol="..."/>`)
    pub symbol: Option<String>,
    /// Contact information
    pub contact: Option<Contact>,
    /// Group information
    pub group: Option<Group>,
    /// Simulation identity string (`<entity_id value="..."/>`)
    pub entity_id: Option<String>,
}

/// Contact information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Callsign for display
    pub callsign: String,
}

/// Group information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Role derived from the entity domain ("ground", "air", "sea", "unknown")
    pub role: String,
    /// Country label
    pub country: String,
    /// Symbol code mirrored for clients that read it from the group
    pub icon_type: String,
}

impl Event {
    /// Affiliation encoded in the second atom of the type (`a-f-G` is friendly).
    ///
    /// Symbol-code types carry the affiliation in their second character
    /// (`SHGP...` is hostile).
    pub fn track_type(&self) -> TrackType {
        let code = if self.event_type.contains('-') {
            self.event_type.split('-').nth(1).and_then(|s| s.chars().next())
        } else {
            self.event_type.chars().nth(1)
        };

        match code.map(|c| c.to_ascii_lowercase()) {
            Some('f') | Some('a') => TrackType::Friendly,
            Some('h') | Some('s') => TrackType::Enemy,
            Some('n') => TrackType::Neutral,
            _ => TrackType::Unknown,
        }
    }

    /// Get the callsign from the contact detail, if present
    pub fn callsign(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(|d| d.contact.as_ref())
            .map(|c| c.callsign.as_str())
    }

    /// Get the group detail, if present
    pub fn group(&self) -> Option<&Group> {
        self.detail.as_ref().and_then(|d| d.group.as_ref())
    }

    /// Get the entity identity string, if present
    pub fn entity_id(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(|d| d.entity_id.as_deref())
    }
}

impl Point {
    /// Create a new Point with "unknown" accuracy values
    pub fn new(lat: f64, lon: f64, hae: f64) -> Self {
        Self {
            lat,
            lon,
            hae,
            ce: UNKNOWN_ERROR_M,
            le: UNKNOWN_ERROR_M,
        }
    }

    /// Create a new Point with specified accuracy
    pub fn with_accuracy(lat: f64, lon: f64, hae: f64, ce: f64, le: f64) -> Self {
        Self {
            lat,
            lon,
            hae,
            ce,
            le,
        }
    }
}

/// Group role for a DIS domain byte.
pub fn role_for_domain(domain: u8) -> &'static str {
    EntityDomain::from_u8(domain).role()
}

/// DIS domain byte implied by a group role. Unrecognized roles map to 0.
pub fn domain_for_role(role: &str) -> u8 {
    match role {
        "ground" => 1,
        "air" => 2,
        "sea" => 3,
        _ => 0,
    }
}

/// Generic CoT type for an affiliation and domain.
///
/// Friendly and enemy tracks in a known domain get `a-f-*` / `a-h-*`;
/// everything else is `a-u-U`.
pub fn fallback_type(track_type: TrackType, domain: u8) -> String {
    let dimension = EntityDomain::from_u8(domain).cot_dimension();
    match (track_type, dimension) {
        (TrackType::Friendly | TrackType::Enemy, Some(dim)) => {
            format!("a-{}-{}", track_type.cot_code(), dim)
        }
        _ => "a-u-U".to_string(),
    }
}
