//! Military grid references for geodetic positions.
//!
//! Latitudes in [-80, 84] are projected to UTM with the Krueger series and
//! labelled with the zone, latitude band, and 100 km square letters. The polar
//! caps use the Universal Polar Stereographic grid.
//!
//! References are written without separators at 1 m precision:
//! `31NAA6602100000` is zone 31, band N, square AA, easting 66021, northing 00000.

use crate::geodesy::{WGS84_A, WGS84_E2};
use std::f64::consts::FRAC_PI_4;

const LAT_BANDS: [char; 20] = [
    'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V',
    'W', 'X',
];

/// Row letters of the 100 km square, repeating every 2000 km of northing
const ROW_LETTERS: [char; 20] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V',
];

/// Column letters for zone sets 1/4, 2/5 and 3/6
const COLUMN_LETTERS: [[char; 8]; 3] = [
    ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'],
    ['J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R'],
    ['S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z'],
];

const HUNDRED_KM: f64 = 100_000.0;

/// A position projected onto a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmCoord {
    pub zone: u8,
    pub band: char,
    /// Meters, including the 500 km false easting
    pub easting: f64,
    /// Meters, including the 10000 km false northing south of the equator
    pub northing: f64,
}

/// A position projected onto the north or south polar stereographic grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpsCoord {
    /// One of `A`, `B` (south) or `Y`, `Z` (north)
    pub zone: char,
    pub easting: f64,
    pub northing: f64,
}

/// Returns the UTM zone for a position, honoring the Norway and Svalbard exceptions.
pub fn utm_zone(lat: f64, lon: f64) -> u8 {
    if lat > 55.0 && lat < 64.0 && lon > 2.0 && lon < 6.0 {
        return 32;
    }

    if lat > 71.0 {
        if (6.0..9.0).contains(&lon) {
            return 31;
        }
        if (9.0..12.0).contains(&lon) || (18.0..21.0).contains(&lon) {
            return 33;
        }
        if (21.0..24.0).contains(&lon) || (30.0..33.0).contains(&lon) {
            return 35;
        }
    }

    ((((lon + 180.0) / 6.0).floor() as i64).rem_euclid(60) + 1) as u8
}

/// Projects a position onto its UTM zone.
///
/// Returns `None` outside the UTM latitude range [-80, 84].
pub fn to_utm(lat: f64, lon: f64) -> Option<UtmCoord> {
    if !(-80.0..=84.0).contains(&lat) {
        return None;
    }

    let zone = utm_zone(lat, lon);
    let band_index = (((lat + 80.0) / 8.0).floor() as usize).min(LAT_BANDS.len() - 1);
    let band = LAT_BANDS[band_index];

    // Krueger series coefficients for WGS84, lengths in km
    let alpha1 = 8.377318188192541E-4;
    let alpha2 = 7.608496958699166E-7;
    let alpha3 = 1.2034877875966646E-9;
    let c = 0.08181919084262149;
    let d = 6364.902166165087;
    let e0 = 500.0;

    let phi = lat.to_radians();
    let lambda0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();
    let dlambda = lon.to_radians() - lambda0;
    let n0 = if lat < 0.0 { 10000.0 } else { 0.0 };

    let sin_phi = phi.sin();
    let t = (sin_phi.atanh() - c * (c * sin_phi).atanh()).sinh();

    let xi = (t / dlambda.cos()).atan();
    let eta = (dlambda.sin() / (1.0 + t * t).sqrt()).atanh();

    let easting = e0
        + d * (eta
            + alpha1 * (2.0 * xi).cos() * (2.0 * eta).sinh()
            + alpha2 * (4.0 * xi).cos() * (4.0 * eta).sinh()
            + alpha3 * (6.0 * xi).cos() * (6.0 * eta).sinh());
    let northing = n0
        + d * (xi
            + alpha1 * (2.0 * xi).sin() * (2.0 * eta).cosh()
            + alpha2 * (4.0 * xi).sin() * (4.0 * eta).cosh()
            + alpha3 * (6.0 * xi).sin() * (6.0 * eta).cosh());

    Some(UtmCoord {
        zone,
        band,
        easting: easting * 1000.0,
        northing: northing * 1000.0,
    })
}

/// Projects a position onto the polar stereographic grid of its hemisphere.
pub fn to_ups(lat: f64, lon: f64) -> UpsCoord {
    const K0: f64 = 0.994;
    const FALSE_ORIGIN: f64 = 2_000_000.0;

    let e = WGS84_E2.sqrt();
    let north = lat >= 0.0;
    let phi = lat.abs().to_radians();
    let lambda = lon.to_radians();

    let e_sin = e * phi.sin();
    let t = (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - e_sin) / (1.0 + e_sin)).powf(e / 2.0);
    let rho = 2.0 * WGS84_A * K0 * t
        / ((1.0 + e).powf(1.0 + e) * (1.0 - e).powf(1.0 - e)).sqrt();

    let easting = FALSE_ORIGIN + rho * lambda.sin();
    let northing = if north {
        FALSE_ORIGIN - rho * lambda.cos()
    } else {
        FALSE_ORIGIN + rho * lambda.cos()
    };

    let zone = match (north, easting < FALSE_ORIGIN) {
        (true, true) => 'Y',
        (true, false) => 'Z',
        (false, true) => 'A',
        (false, false) => 'B',
    };

    UpsCoord {
        zone,
        easting,
        northing,
    }
}

/// Full-precision (1 m) grid reference for a position.
///
/// Deterministic for every latitude in [-90, 90] and longitude in [-180, 180];
/// the result is unspecified outside that range.
///
/// # Example
/// ```
/// use trackbridge_dis::mgrs::geodetic_to_grid;
///
/// assert_eq!(geodetic_to_grid(0.0, 0.0), "31NAA6602100000");
/// ```
pub fn geodetic_to_grid(lat: f64, lon: f64) -> String {
    match to_utm(lat, lon) {
        Some(utm) => format_utm(&utm),
        None => format_ups(&to_ups(lat, lon)),
    }
}

/// Grid reference truncated to `5 + 2 * digits` characters.
///
/// `digits = 2` gives 1 km, `3` gives 100 m, `4` gives 10 m. A reference that is
/// already shorter than the requested length is returned whole.
pub fn geodetic_to_grid_with_precision(lat: f64, lon: f64, digits: usize) -> String {
    let mut full = geodetic_to_grid(lat, lon);
    let keep = digits.saturating_mul(2).saturating_add(5);
    if full.len() >= keep {
        full.truncate(keep);
    }
    full
}

fn format_utm(utm: &UtmCoord) -> String {
    let set = (utm.zone as usize - 1) % 3;
    let column = ((utm.easting / HUNDRED_KM).floor() as i64 - 1).clamp(0, 7) as usize;

    let row_shift = if utm.zone % 2 == 0 { 5 } else { 0 };
    let row = ((utm.northing / HUNDRED_KM).floor() as i64 + row_shift).rem_euclid(20) as usize;

    format!(
        "{:02}{}{}{}{}",
        utm.zone,
        utm.band,
        COLUMN_LETTERS[set][column],
        ROW_LETTERS[row],
        digits(utm.easting, utm.northing)
    )
}

fn format_ups(ups: &UpsCoord) -> String {
    // (first column letter, false easting, false northing) of each polar zone
    let (column_origin, false_easting, false_northing) = match ups.zone {
        'A' => (b'J', 800_000.0, 800_000.0),
        'B' => (b'A', 2_000_000.0, 800_000.0),
        'Y' => (b'J', 800_000.0, 1_300_000.0),
        _ => (b'A', 2_000_000.0, 1_300_000.0),
    };

    let mut column = column_origin
        .saturating_add(((ups.easting - false_easting).max(0.0) / HUNDRED_KM).floor() as u8);
    if ups.easting < 2_000_000.0 {
        if column > b'L' {
            column = column.saturating_add(3);
        }
        if column > b'U' {
            column = column.saturating_add(2);
        }
    } else {
        if column > b'C' {
            column = column.saturating_add(2);
        }
        if column > b'H' {
            column = column.saturating_add(1);
        }
        if column > b'L' {
            column = column.saturating_add(3);
        }
    }

    let mut row =
        b'A'.saturating_add(((ups.northing - false_northing).max(0.0) / HUNDRED_KM).floor() as u8);
    if row > b'H' {
        row = row.saturating_add(1);
    }
    if row > b'N' {
        row = row.saturating_add(1);
    }

    format!(
        "{}{}{}{}",
        ups.zone,
        column.min(b'Z') as char,
        row.min(b'Z') as char,
        digits(ups.easting, ups.northing)
    )
}

fn digits(easting: f64, northing: f64) -> String {
    let e = (easting.floor() as i64).rem_euclid(100_000);
    let n = (northing.floor() as i64).rem_euclid(100_000);
    format!("{:05}{:05}", e, n)
}
