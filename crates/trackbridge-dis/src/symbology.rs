//! Lookup tables from DIS entity-type fields to affiliation, symbol and labels.
//!
//! DIS identifies a platform by (kind, domain, country, category, ...) and an
//! exercise force id. TAK clients want a MIL-STD-2525 symbol code, an
//! affiliation and a short country label. Every table here is total: unmapped
//! inputs fall back to a default rather than failing.

use trackbridge_core::types::TrackType;

/// Symbol used for any entity type without a table entry (friendly ground unit).
pub const DEFAULT_SYMBOL: &str = "SFGPUCI----K---";

/// Length of a well-formed MIL-STD-2525 symbol code.
pub const SYMBOL_LEN: usize = 15;

/// DIS country numbers with a known label.
pub mod country {
    pub const AUSTRALIA: u16 = 13;
    pub const CANADA: u16 = 38;
    pub const CHINA: u16 = 45;
    pub const FRANCE: u16 = 71;
    pub const IRAN: u16 = 97;
    pub const NORTH_KOREA: u16 = 115;
    pub const RUSSIA: u16 = 222;
    pub const UNITED_KINGDOM: u16 = 224;
    pub const UNITED_STATES: u16 = 225;
}

/// Maps a DIS country number to its label.
///
/// Country 0 is DIS "other/unspecified" and maps to `Unknown`; any other
/// number without an entry maps to `Other`.
#[inline]
pub const fn country_label(code: u16) -> &'static str {
    match code {
        country::UNITED_STATES => "USA",
        country::UNITED_KINGDOM => "UK",
        country::AUSTRALIA => "AUS",
        country::FRANCE => "FRA",
        country::CANADA => "CAN",
        country::RUSSIA => "RUS",
        country::CHINA => "CHN",
        country::IRAN => "IRN",
        country::NORTH_KOREA => "PRK",
        0 => "Unknown",
        _ => "Other",
    }
}

/// Affiliation implied by a country label alone.
#[inline]
pub fn country_affiliation(label: &str) -> TrackType {
    match label {
        "USA" | "UK" | "AUS" | "FRA" | "CAN" => TrackType::Friendly,
        "RUS" | "CHN" | "IRN" | "PRK" => TrackType::Enemy,
        _ => TrackType::Unknown,
    }
}

/// Resolves the affiliation of an entity.
///
/// Force id 1 is friendly and 2 is opposing. Any other force id is refined by
/// the country table.
pub fn affiliation(force_id: u8, country: &str) -> TrackType {
    match force_id {
        1 => TrackType::Friendly,
        2 => TrackType::Enemy,
        _ => country_affiliation(country),
    }
}

/// MIL-STD-2525 symbol for a DIS entity type.
#[inline]
pub const fn symbol_for(kind: u8, domain: u8, country_code: u16, category: u8) -> &'static str {
    match (kind, domain, country_code, category) {
        (1, 2, country::UNITED_STATES, 11) => "SHGPUCT----K---",
        (1, 2, country::UNITED_STATES, 2) => "SFGPUCV----K---",
        (1, 2, 0, 50) => "SFGPUCS----K---",
        _ => DEFAULT_SYMBOL,
    }
}

/// Coarse platform label for a DIS entity kind and category.
#[inline]
pub const fn platform_label(kind: u8, category: u8) -> &'static str {
    match (kind, category) {
        (1, 11) => "Tank",
        (1, 2) => "Truck",
        (1, 50) => "Sensor",
        _ => "Unknown",
    }
}

/// True if `symbol` has the shape of a MIL-STD-2525 code.
#[inline]
pub fn is_symbol_code(symbol: &str) -> bool {
    symbol.chars().count() == SYMBOL_LEN
}
