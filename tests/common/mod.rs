//! Common test utilities and helpers for integration tests

use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UdpSocket;
use trackbridge_core::types::EntityIdentity;
use trackbridge_dis::geodesy::geodetic_to_ecef;
use trackbridge_dis::pdu::EntityStatePdu;

/// How long a test waits for a datagram
pub const WAIT: Duration = Duration::from_secs(3);

/// Get the path to test fixtures
pub fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("tests").join("fixtures")
}

/// Encoded Entity State PDU for a US tank at the given position
pub fn tank_pdu(entity: u16, marking: &str, lat: f64, lon: f64) -> Vec<u8> {
    EntityStatePdu {
        version: 6,
        force_id: 1,
        identity: EntityIdentity::new(1, 3101, entity),
        kind: 1,
        domain: 1,
        country: 225,
        category: 11,
        location: geodetic_to_ecef(lat, lon, 250.0),
        marking: Some(marking.to_string()),
    }
    .encode()
    .to_vec()
}

/// Receive one datagram as UTF-8, panicking after [`WAIT`]
pub async fn recv_string(socket: &UdpSocket) -> String {
    let mut buf = vec![0u8; 4096];
    let (len, _) = tokio::time::timeout(WAIT, socket.recv_from(&mut buf))
        .await
        .expect("timed out waiting for datagram")
        .expect("recv failed");
    String::from_utf8(buf[..len].to_vec()).expect("datagram is not UTF-8")
}
