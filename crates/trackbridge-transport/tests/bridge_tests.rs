//! End-to-end bridge behavior over loopback UDP.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};
use trackbridge_core::config::AppConfig;
use trackbridge_core::types::{EntityIdentity, TrackType};
use trackbridge_dis::geodesy::geodetic_to_ecef;
use trackbridge_dis::pdu::EntityStatePdu;
use trackbridge_transport::{read_entries, ListenerState, TrackBridge};

const WAIT: Duration = Duration::from_secs(3);

struct Harness {
    bridge: TrackBridge,
    cot_rx: UdpSocket,
    dis_tx: UdpSocket,
    dis_addr: SocketAddr,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let cot_rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut config = AppConfig::default();
    config.cot.target_ip = "127.0.0.1".to_string();
    config.cot.port = cot_rx.local_addr().unwrap().port();
    config.heartbeat.enabled = false;
    config.history.path = dir.path().join("history.log");

    let bridge = TrackBridge::new(config).await.unwrap();
    let bound = bridge.start_listening("127.0.0.1", 0).await.unwrap();
    let dis_addr = SocketAddr::from(([127, 0, 0, 1], bound.port()));

    Harness {
        bridge,
        cot_rx,
        dis_tx: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
        dis_addr,
        _dir: dir,
    }
}

fn pdu(entity: u16, marking: &str) -> Vec<u8> {
    EntityStatePdu {
        version: 7,
        force_id: 1,
        identity: EntityIdentity::new(1, 3101, entity),
        kind: 1,
        domain: 1,
        country: 225,
        category: 11,
        location: geodetic_to_ecef(36.5, -117.25, 120.0),
        marking: Some(marking.to_string()),
    }
    .encode()
    .to_vec()
}

async fn recv_cot(socket: &UdpSocket) -> String {
    let mut buf = vec![0u8; 4096];
    let (len, _) = timeout(WAIT, socket.recv_from(&mut buf)).await.unwrap().unwrap();
    String::from_utf8(buf[..len].to_vec()).unwrap()
}

#[tokio::test]
async fn test_pdu_becomes_cot() {
    let h = harness().await;
    let mut tracks = h.bridge.subscribe();

    h.dis_tx.send_to(&pdu(42, "Viper 1"), h.dis_addr).await.unwrap();

    let track = timeout(WAIT, tracks.recv()).await.unwrap().unwrap();
    assert_eq!(track.identity, EntityIdentity::new(1, 3101, 42));
    assert_eq!(track.track_type, TrackType::Friendly);
    assert_eq!(track.custom_marking, "Viper 1");
    assert_eq!(track.platform_type, "Tank");

    let xml = recv_cot(&h.cot_rx).await;
    assert!(xml.contains(r#"uid="TrackBridge-1:3101:42""#));
    assert!(xml.contains(r#"<contact callsign="Viper 1"/>"#));

    let rebuilt = assert_ok!(h.bridge.build_track(&xml));
    assert_eq!(rebuilt.identity, track.identity);
    assert!((rebuilt.lat - track.lat).abs() < 1e-4);
    assert!((rebuilt.lon - track.lon).abs() < 1e-4);
    assert!((rebuilt.alt - track.alt).abs() < 1e-4);

    // The journal is appended right after the datagram leaves
    let path = h.bridge.config().history.path.clone();
    let mut journal = read_entries(&path).await.unwrap();
    for _ in 0..50 {
        if !journal.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        journal = read_entries(&path).await.unwrap();
    }
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].xml, xml);

    let metrics = h.bridge.metrics();
    assert_eq!(metrics.tracks_emitted, 1);
    assert_eq!(metrics.messages_sent, 1);
}

#[tokio::test]
async fn test_locked_marking_is_kept() {
    let h = harness().await;
    let mut tracks = h.bridge.subscribe();
    let identity = EntityIdentity::new(1, 3101, 7);

    h.bridge.set_lock(identity, "Alpha", true);

    for marking in ["Decoded", "Other"] {
        h.dis_tx.send_to(&pdu(7, marking), h.dis_addr).await.unwrap();
        let track = timeout(WAIT, tracks.recv()).await.unwrap().unwrap();
        assert_eq!(track.custom_marking, "Alpha");
        assert!(track.marking_locked);
        assert!(recv_cot(&h.cot_rx).await.contains(r#"callsign="Alpha""#));
    }
}

#[tokio::test]
async fn test_unpublished_tracks_are_not_sent() {
    let h = harness().await;
    let mut tracks = h.bridge.subscribe();

    h.bridge.set_publish(EntityIdentity::new(1, 3101, 1), false);
    h.dis_tx.send_to(&pdu(1, "Hidden"), h.dis_addr).await.unwrap();
    let hidden = timeout(WAIT, tracks.recv()).await.unwrap().unwrap();
    assert!(!hidden.publish);

    h.dis_tx.send_to(&pdu(2, "Shown"), h.dis_addr).await.unwrap();
    timeout(WAIT, tracks.recv()).await.unwrap().unwrap();

    let xml = recv_cot(&h.cot_rx).await;
    assert!(xml.contains(r#"callsign="Shown""#));
    assert_eq!(h.bridge.tracks().len(), 2);
}

#[tokio::test]
async fn test_malformed_datagrams_do_not_stop_the_loop() {
    let h = harness().await;
    let mut tracks = h.bridge.subscribe();

    let mut wrong_type = pdu(3, "X");
    wrong_type[2] = 2;
    for datagram in [vec![7u8, 0, 1], wrong_type, vec![0u8; 200]] {
        h.dis_tx.send_to(&datagram, h.dis_addr).await.unwrap();
    }
    h.dis_tx.send_to(&pdu(3, "Good"), h.dis_addr).await.unwrap();

    let track = timeout(WAIT, tracks.recv()).await.unwrap().unwrap();
    assert_eq!(track.custom_marking, "Good");

    let metrics = h.bridge.metrics();
    assert_eq!(metrics.datagrams_received, 4);
    assert_eq!(metrics.decode_failures, 3);
    assert_eq!(h.bridge.listener_state(), ListenerState::Listening);
}

#[tokio::test]
async fn test_listener_restart_and_target_change() {
    let h = harness().await;
    let mut tracks = h.bridge.subscribe();

    h.bridge.stop_listening();
    h.bridge.stop_listening();
    assert_eq!(h.bridge.listener_state(), ListenerState::Stopped);

    let bound = h.bridge.start_listening("127.0.0.1", 0).await.unwrap();
    let dis_addr = SocketAddr::from(([127, 0, 0, 1], bound.port()));

    let new_rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = new_rx.local_addr().unwrap().port();
    assert_err!(h.bridge.set_target("256.0.0.1", port));
    assert_err!(h.bridge.set_target("::1", port));
    assert_ok!(h.bridge.set_target("127.0.0.1", port));

    h.dis_tx.send_to(&pdu(5, "Moved"), dis_addr).await.unwrap();
    timeout(WAIT, tracks.recv()).await.unwrap().unwrap();
    assert!(recv_cot(&new_rx).await.contains(r#"callsign="Moved""#));
}

#[tokio::test]
async fn test_heartbeat_through_bridge() {
    let h = harness().await;

    assert_err!(h.bridge.set_heartbeat_interval_seconds(0));
    assert_ok!(h.bridge.set_heartbeat_interval_seconds(60));

    h.bridge.start_heartbeat();
    let xml = recv_cot(&h.cot_rx).await;
    assert!(xml.contains(r#"uid="TrackBridge-Heartbeat""#));
    assert!(xml.contains(r#"ce="9999999.0""#));
    assert!(h.bridge.heartbeat().is_running());

    h.bridge.stop_heartbeat();
    assert!(!h.bridge.heartbeat().is_running());
}
