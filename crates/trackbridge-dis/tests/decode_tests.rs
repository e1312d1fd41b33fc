//! Decoder behavior over whole datagrams: header rejection, malformed input,
//! and the position range guarantee.

use trackbridge_core::types::{EntityIdentity, TrackType};
use trackbridge_dis::geodesy::geodetic_to_ecef;
use trackbridge_dis::pdu::{decode, DecodeError, EntityStatePdu, ENTITY_STATE_LEN};

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn next_f64(&mut self, min: f64, max: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        min + unit * (max - min)
    }

    fn fill(&mut self, buf: &mut [u8]) {
        for byte in buf {
            *byte = (self.next_u64() >> 56) as u8;
        }
    }
}

fn pdu_at(lat: f64, lon: f64, alt: f64) -> EntityStatePdu {
    EntityStatePdu {
        version: 6,
        force_id: 0,
        identity: EntityIdentity::new(10, 20, 30),
        kind: 1,
        domain: 3,
        country: 224,
        category: 0,
        location: geodetic_to_ecef(lat, lon, alt),
        marking: Some("HMS Test".to_string()),
    }
}

#[test]
fn test_every_short_buffer_is_rejected() {
    let full = pdu_at(0.0, 0.0, 0.0).encode();
    for len in 0..48 {
        assert_eq!(decode(&full[..len]), Err(DecodeError::TooShort { len }));
    }
}

#[test]
fn test_every_other_version_is_rejected() {
    let mut buf = pdu_at(0.0, 0.0, 0.0).encode().to_vec();
    for version in (0..=255u8).filter(|v| !matches!(v, 6 | 7)) {
        buf[0] = version;
        assert_eq!(decode(&buf), Err(DecodeError::UnsupportedVersion(version)));
    }
}

#[test]
fn test_every_other_pdu_type_is_rejected() {
    let mut buf = pdu_at(0.0, 0.0, 0.0).encode().to_vec();
    for pdu_type in (0..=255u8).filter(|t| *t != 1) {
        buf[2] = pdu_type;
        assert_eq!(decode(&buf), Err(DecodeError::NotEntityState(pdu_type)));
    }
}

#[test]
fn test_random_bytes_never_panic() {
    let mut rng = Lcg(0x5eed);
    for _ in 0..5_000 {
        let len = (rng.next_u64() % 200) as usize;
        let mut buf = vec![0u8; len];
        rng.fill(&mut buf);
        if len > 2 && rng.next_u64() % 2 == 0 {
            buf[0] = 7;
            buf[2] = 1;
        }

        if let Ok(record) = decode(&buf) {
            assert!((-90.0..=90.0).contains(&record.lat), "lat {}", record.lat);
            assert!((-180.0..=180.0).contains(&record.lon), "lon {}", record.lon);
            assert!(record.alt.is_finite());
            assert!(record.alt >= -1000.0);
        }
    }
}

#[test]
fn test_positions_survive_decoding() {
    let mut rng = Lcg(42);
    for _ in 0..1_000 {
        let lat = rng.next_f64(-90.0, 90.0);
        let lon = rng.next_f64(-180.0, 180.0);
        let alt = rng.next_f64(-500.0, 20_000.0);

        let record = decode(&pdu_at(lat, lon, alt).encode()).unwrap();
        assert!((record.lat - lat).abs() < 1e-6, "{lat} vs {}", record.lat);
        assert!(lat.abs() > 89.9 || (record.lon - lon).abs() < 1e-6);
        assert!((record.alt - alt).abs() < 0.05, "{alt} vs {}", record.alt);
        assert!(!record.grid_ref.is_empty());
    }
}

#[test]
fn test_british_surface_vessel() {
    let record = decode(&pdu_at(50.8, -1.1, 0.0).encode()).unwrap();
    assert_eq!(record.track_type, TrackType::Friendly);
    assert_eq!(record.country_code, "UK");
    assert_eq!(record.custom_marking, "HMS Test");
    assert_eq!(record.identity.to_string(), "10:20:30");
    assert_eq!(record.display_id, record.identity.display_id());
}

#[test]
fn test_trailing_articulation_bytes_are_ignored() {
    let mut buf = pdu_at(1.0, 2.0, 3.0).encode().to_vec();
    buf.extend_from_slice(&[0xAB; 64]);
    assert!(buf.len() > ENTITY_STATE_LEN);

    let record = decode(&buf).unwrap();
    assert_eq!(record.custom_marking, "HMS Test");
}
