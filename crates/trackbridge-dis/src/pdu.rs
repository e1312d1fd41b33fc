//! DIS Entity State PDU decoding.
//!
//! Only the fields the bridge needs are read. Every multi-byte field is
//! big-endian on the wire; reads go through `bytes::Buf`, which converts
//! regardless of host endianness. Every read is bounds-checked, so a truncated
//! or hostile datagram yields a `DecodeError` and never a panic.
//!
//! Layout (byte offsets into the PDU):
//!
//! | offset | width | field |
//! |---|---|---|
//! | 0 | 1 | protocol version (6 or 7) |
//! | 2 | 1 | PDU type (1 = Entity State) |
//! | 11 | 1 | force id |
//! | 12, 14, 16 | 2 each | site, application, entity |
//! | 20, 21 | 1 each | entity kind, domain |
//! | 22 | 2 | country |
//! | 24 | 1 | category |
//! | 48, 56, 64 | 8 each | ECEF x, y, z (meters) |
//! | 128 | 1 + 11 | marking charset, marking text |

use crate::geodesy::ecef_to_geodetic;
use crate::mgrs::geodetic_to_grid;
use crate::symbology;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::Utc;
use thiserror::Error;
use trackbridge_core::types::{CoordinateError, EntityIdentity, TrackRecord};

/// Smallest datagram that can hold an Entity State header.
pub const MIN_PDU_LEN: usize = 48;

/// Length of a standard Entity State PDU without articulation parameters.
pub const ENTITY_STATE_LEN: usize = 144;

/// PDU type of an Entity State PDU.
pub const ENTITY_STATE_PDU_TYPE: u8 = 1;

/// Offset of the marking block (charset byte followed by the text).
pub const MARKING_OFFSET: usize = 128;

/// Width of the marking text.
pub const MARKING_LEN: usize = 11;

/// Altitudes below this are treated as a ground-reference sentinel.
const MIN_ALTITUDE: f64 = -1000.0;

const ECEF_OFFSET: usize = 48;

/// Reasons a datagram is rejected. Each variant is a distinct failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("PDU too short: {len} bytes (minimum {MIN_PDU_LEN})")]
    TooShort { len: usize },

    #[error("Unsupported DIS protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Not an Entity State PDU (type {0})")]
    NotEntityState(u8),

    #[error("Field at offset {offset} ({width} bytes) lies outside the PDU")]
    FieldOutOfBounds { offset: usize, width: usize },

    #[error("Coordinates out of range: lat={lat}, lon={lon}")]
    CoordinateOutOfRange { lat: f64, lon: f64 },
}

impl From<CoordinateError> for DecodeError {
    fn from(err: CoordinateError) -> Self {
        DecodeError::CoordinateOutOfRange {
            lat: err.lat,
            lon: err.lon,
        }
    }
}

/// Raw fields of an Entity State PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStatePdu {
    pub version: u8,
    pub force_id: u8,
    pub identity: EntityIdentity,
    pub kind: u8,
    pub domain: u8,
    pub country: u16,
    pub category: u8,
    /// ECEF position in meters
    pub location: (f64, f64, f64),
    /// Marking text, when the block is present and holds a usable label
    pub marking: Option<String>,
}

impl EntityStatePdu {
    /// Validates the header and extracts the raw fields.
    ///
    /// Checks run in order: length, protocol version, PDU type.
    pub fn parse(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < MIN_PDU_LEN {
            return Err(DecodeError::TooShort { len: buf.len() });
        }
        if !matches!(buf[0], 6 | 7) {
            return Err(DecodeError::UnsupportedVersion(buf[0]));
        }
        if buf[2] != ENTITY_STATE_PDU_TYPE {
            return Err(DecodeError::NotEntityState(buf[2]));
        }

        let reader = PduReader::new(buf);
        let identity = EntityIdentity::new(reader.u16_at(12)?, reader.u16_at(14)?, reader.u16_at(16)?);

        Ok(Self {
            version: buf[0],
            force_id: reader.u8_at(11)?,
            identity,
            kind: reader.u8_at(20)?,
            domain: reader.u8_at(21)?,
            country: reader.u16_at(22)?,
            category: reader.u8_at(24)?,
            location: (
                reader.f64_at(ECEF_OFFSET)?,
                reader.f64_at(ECEF_OFFSET + 8)?,
                reader.f64_at(ECEF_OFFSET + 16)?,
            ),
            marking: reader.marking(),
        })
    }

    /// Serializes the fields into a 144-byte Entity State PDU.
    ///
    /// Unused fields are zero. The marking is written with the ASCII charset
    /// and padded with NULs.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENTITY_STATE_LEN);

        buf.put_u8(self.version);
        buf.put_u8(1); // exercise id
        buf.put_u8(ENTITY_STATE_PDU_TYPE);
        buf.put_u8(1); // protocol family: entity information
        buf.put_u32(0); // timestamp
        buf.put_u16(ENTITY_STATE_LEN as u16);
        buf.put_u8(0);
        buf.put_u8(self.force_id);
        buf.put_u16(self.identity.site);
        buf.put_u16(self.identity.application);
        buf.put_u16(self.identity.entity);
        buf.put_bytes(0, 2);
        buf.put_u8(self.kind);
        buf.put_u8(self.domain);
        buf.put_u16(self.country);
        buf.put_u8(self.category);
        buf.put_bytes(0, ECEF_OFFSET - buf.len());

        buf.put_f64(self.location.0);
        buf.put_f64(self.location.1);
        buf.put_f64(self.location.2);
        buf.put_bytes(0, MARKING_OFFSET - buf.len());

        buf.put_u8(1); // ASCII
        let text = self.marking.as_deref().unwrap_or_default().as_bytes();
        let take = text.len().min(MARKING_LEN);
        buf.put_slice(&text[..take]);
        buf.put_bytes(0, ENTITY_STATE_LEN - buf.len());

        buf.freeze()
    }

    /// Converts the raw fields into a track record.
    pub fn into_track(self) -> Result<TrackRecord, DecodeError> {
        let (x, y, z) = self.location;
        let (lat, lon, alt) = normalize_position(ecef_to_geodetic(x, y, z));

        let country_code = symbology::country_label(self.country);

        let mut record = TrackRecord::new(self.identity, lat, lon, alt)?;
        record.track_type = symbology::affiliation(self.force_id, country_code);
        record.entity_kind = self.kind;
        record.domain = self.domain;
        record.category = self.category;
        record.country_code = country_code.to_string();
        record.symbol_id =
            symbology::symbol_for(self.kind, self.domain, self.country, self.category).to_string();
        record.platform_type = symbology::platform_label(self.kind, self.category).to_string();
        record.custom_marking = self.marking.unwrap_or_default();
        record.last_update = Utc::now();
        record.grid_ref = geodetic_to_grid(lat, lon);

        Ok(record)
    }
}

/// Decodes a datagram into a track record.
///
/// No partial record is ever produced: any failure short-circuits.
///
/// # Example
///
/// ```
/// use trackbridge_dis::pdu::{decode, DecodeError};
///
/// assert_eq!(decode(&[0u8; 12]), Err(DecodeError::TooShort { len: 12 }));
/// ```
pub fn decode(buf: &[u8]) -> Result<TrackRecord, DecodeError> {
    EntityStatePdu::parse(buf)?.into_track()
}

/// Applies the sentinel rules to a converted position.
///
/// Non-finite values zero all three components; altitudes below -1000 m clamp
/// to 0.
fn normalize_position((lat, lon, alt): (f64, f64, f64)) -> (f64, f64, f64) {
    if !(lat.is_finite() && lon.is_finite() && alt.is_finite()) {
        return (0.0, 0.0, 0.0);
    }
    let alt = if alt < MIN_ALTITUDE { 0.0 } else { alt };
    (lat, lon, alt)
}

/// Bounds-checked big-endian field access.
struct PduReader<'a> {
    buf: &'a [u8],
}

impl<'a> PduReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn field(&self, offset: usize, width: usize) -> Result<&'a [u8], DecodeError> {
        offset
            .checked_add(width)
            .and_then(|end| self.buf.get(offset..end))
            .ok_or(DecodeError::FieldOutOfBounds { offset, width })
    }

    fn u8_at(&self, offset: usize) -> Result<u8, DecodeError> {
        Ok(self.field(offset, 1)?.get_u8())
    }

    fn u16_at(&self, offset: usize) -> Result<u16, DecodeError> {
        Ok(self.field(offset, 2)?.get_u16())
    }

    fn f64_at(&self, offset: usize) -> Result<f64, DecodeError> {
        Ok(self.field(offset, 8)?.get_f64())
    }

    /// Reads the marking text if the whole block is present.
    ///
    /// Control and non-ASCII bytes become `?`; trailing NULs and spaces are
    /// trimmed. A
    /// marking without any alphanumeric character is treated as absent.
    fn marking(&self) -> Option<String> {
        let charset = self.field(MARKING_OFFSET, 1).ok()?[0];
        if charset != 1 {
            tracing::debug!(charset, "marking charset is not ASCII; decoding as ASCII");
        }

        let raw = self.field(MARKING_OFFSET + 1, MARKING_LEN).ok()?;
        let text: String = raw
            .iter()
            .map(|&b| match b {
                0 | b' '..=b'~' => b as char,
                _ => '?',
            })
            .collect();
        let text = text.trim_end_matches(['\0', ' ']);

        text.chars()
            .any(|c| c.is_ascii_alphanumeric())
            .then(|| text.to_string())
    }
}
