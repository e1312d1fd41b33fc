//! CoT encoding of tracks and heartbeat pings, and the inverse `build_track`.

use crate::event::{
    domain_for_role, fallback_type, role_for_domain, Contact, Detail, Event, Group, Point,
    TRACK_ERROR_M, UNKNOWN_ERROR_M,
};
use crate::parser::{parse_cot, ParseError};
use crate::serializer::serialize_event;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, error};
use trackbridge_core::config::CotConfig;
use trackbridge_core::types::{EntityIdentity, TrackRecord};
use trackbridge_dis::mgrs::geodetic_to_grid;
use trackbridge_dis::symbology::{is_symbol_code, DEFAULT_SYMBOL};

/// CoT type of the heartbeat ping
pub const PING_TYPE: &str = "a-f-G-U-C";

const COT_VERSION: &str = "2.0";
const MACHINE_GENERATED: &str = "m-g";
const DEFAULT_STALE: Duration = Duration::from_secs(30);

/// Stateless encoder turning tracks into CoT XML strings.
///
/// Encoding never fails outward: a `None` result means there is nothing to
/// send, and the cause has already been logged.
#[derive(Debug, Clone)]
pub struct CotEncoder {
    uid_prefix: String,
    product_name: String,
    stale: Duration,
}

impl Default for CotEncoder {
    fn default() -> Self {
        Self::new("TrackBridge", "TrackBridge")
    }
}

impl CotEncoder {
    pub fn new(uid_prefix: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            uid_prefix: uid_prefix.into(),
            product_name: product_name.into(),
            stale: DEFAULT_STALE,
        }
    }

    pub fn from_config(config: &CotConfig) -> Self {
        Self::new(config.uid_prefix.clone(), config.product_name.clone()).with_stale(config.stale())
    }

    /// Sets the window between `time` and `stale`.
    pub fn with_stale(mut self, stale: Duration) -> Self {
        self.stale = stale;
        self
    }

    pub fn uid_prefix(&self) -> &str {
        &self.uid_prefix
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Event uid for an identity: `<prefix>-<site:app:entity>`.
    pub fn uid_for(&self, identity: &EntityIdentity) -> String {
        format!("{}-{}", self.uid_prefix, identity)
    }

    /// Encodes a track stamped with the current time.
    ///
    /// Records with out-of-range coordinates encode as the heartbeat ping.
    pub fn encode_track(&self, record: &TrackRecord) -> Option<String> {
        self.encode_track_at(record, Utc::now())
    }

    /// Encodes a track stamped with `now`.
    pub fn encode_track_at(&self, record: &TrackRecord, now: DateTime<Utc>) -> Option<String> {
        if !record.has_valid_position() {
            debug!(
                identity = %record.identity,
                lat = record.lat,
                lon = record.lon,
                "Track position out of range, sending ping instead"
            );
            return self.encode_ping_at(now);
        }

        let event = self.track_event(record, now);
        self.render(&event)
    }

    /// Builds the event for a track without serializing it.
    pub fn track_event(&self, record: &TrackRecord, now: DateTime<Utc>) -> Event {
        let symbol = if is_symbol_code(&record.symbol_id) {
            record.symbol_id.clone()
        } else {
            DEFAULT_SYMBOL.to_string()
        };

        let event_type = if is_symbol_code(&record.symbol_id) {
            record.symbol_id.clone()
        } else {
            fallback_type(record.track_type, record.domain)
        };

        let callsign = if record.custom_marking.trim().is_empty() {
            format!("Track-{}", record.identity)
        } else {
            record.custom_marking.clone()
        };

        Event {
            version: COT_VERSION.to_string(),
            uid: self.uid_for(&record.identity),
            event_type,
            time: now,
            start: now,
            stale: self.stale_time(now),
            how: MACHINE_GENERATED.to_string(),
            point: Point::with_accuracy(
                record.lat,
                record.lon,
                record.alt,
                TRACK_ERROR_M,
                TRACK_ERROR_M,
            ),
            detail: Some(Detail {
                symbol: Some(symbol.clone()),
                contact: Some(Contact { callsign }),
                group: Some(Group {
                    role: role_for_domain(record.domain).to_string(),
                    country: record.country_code.clone(),
                    icon_type: symbol,
                }),
                entity_id: Some(record.identity.to_string()),
            }),
        }
    }

    /// Encodes the heartbeat ping stamped with the current time.
    pub fn encode_ping(&self) -> Option<String> {
        self.encode_ping_at(Utc::now())
    }

    pub fn encode_ping_at(&self, now: DateTime<Utc>) -> Option<String> {
        let event = Event {
            version: COT_VERSION.to_string(),
            uid: format!("{}-Heartbeat", self.uid_prefix),
            event_type: PING_TYPE.to_string(),
            time: now,
            start: now,
            stale: self.stale_time(now),
            how: MACHINE_GENERATED.to_string(),
            point: Point::with_accuracy(0.0, 0.0, 0.0, UNKNOWN_ERROR_M, UNKNOWN_ERROR_M),
            detail: Some(Detail {
                contact: Some(Contact {
                    callsign: self.product_name.clone(),
                }),
                ..Detail::default()
            }),
        };

        self.render(&event)
    }

    /// Rebuilds a track from CoT XML produced by [`CotEncoder::encode_track`].
    ///
    /// The identity comes from the `entity_id` detail, falling back to the
    /// part of the uid after its last `-`.
    pub fn build_track(&self, xml: &str) -> Result<TrackRecord, ParseError> {
        build_track(xml)
    }

    fn stale_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stale = chrono::Duration::from_std(self.stale).unwrap_or(chrono::Duration::seconds(30));
        now + stale
    }

    fn render(&self, event: &Event) -> Option<String> {
        match serialize_event(event) {
            Ok(xml) => Some(xml),
            Err(e) => {
                error!(uid = %event.uid, error = %e, "Failed to serialize CoT event");
                None
            }
        }
    }
}

/// Parses CoT XML back into a [`TrackRecord`].
pub fn build_track(xml: &str) -> Result<TrackRecord, ParseError> {
    let event = parse_cot(xml)?;

    let identity = identity_of(&event)?;
    let point = &event.point;
    let mut record = TrackRecord::new(identity, point.lat, point.lon, point.hae).map_err(|e| {
        ParseError::InvalidValue {
            field: "point".to_string(),
            reason: e.to_string(),
        }
    })?;

    record.track_type = event.track_type();
    record.last_update = event.time;
    record.grid_ref = geodetic_to_grid(record.lat, record.lon);

    if let Some(callsign) = event.callsign() {
        record.custom_marking = callsign.to_string();
    }

    if let Some(group) = event.group() {
        record.country_code = group.country.clone();
        record.domain = domain_for_role(&group.role);
        record.symbol_id = group.icon_type.clone();
    }

    if record.symbol_id.is_empty() {
        if let Some(symbol) = event.detail.as_ref().and_then(|d| d.symbol.as_ref()) {
            record.symbol_id = symbol.clone();
        }
    }

    Ok(record)
}

fn identity_of(event: &Event) -> Result<EntityIdentity, ParseError> {
    if let Some(identity) = event.entity_id().and_then(|id| id.parse().ok()) {
        return Ok(identity);
    }

    event
        .uid
        .rsplit_once('-')
        .and_then(|(_, suffix)| suffix.parse().ok())
        .ok_or_else(|| ParseError::InvalidValue {
            field: "uid".to_string(),
            reason: format!("no entity identity in '{}'", event.uid),
        })
}
