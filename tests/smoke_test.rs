//! Smoke tests across the whole pipeline: DIS in, CoT out, journal, replay.

mod common;

use common::{fixtures_dir, recv_string, tank_pdu, WAIT};
use std::time::Duration;
use tokio::net::UdpSocket;
use trackbridge_core::config::{AppConfig, LogFormat};
use trackbridge_core::types::EntityIdentity;
use trackbridge_cot::build_track;
use trackbridge_transport::{
    read_entries, CotSender, ReplayPlan, TrackBridge, TransportMetrics,
};

#[test]
fn test_fixture_config_loads() {
    let config = AppConfig::from_file(fixtures_dir().join("config.yaml")).unwrap();

    assert_eq!(config.dis.bind_ip, "127.0.0.1");
    assert_eq!(config.cot.uid_prefix, "Smoke");
    assert_eq!(config.cot.stale_secs, 45);
    assert!(!config.heartbeat.enabled);
    assert_eq!(config.filter.allowed_domains, vec![1, 2]);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_journal_fixture_replay_plan() {
    let entries = read_entries(fixtures_dir().join("history.log")).await.unwrap();
    assert_eq!(entries.len(), 3);

    let plan = ReplayPlan::new(entries, 4.0).unwrap();
    let offsets: Vec<Duration> = plan.schedule().map(|(offset, _)| offset).collect();
    assert_eq!(
        offsets,
        vec![
            Duration::ZERO,
            Duration::from_millis(250),
            Duration::from_millis(500)
        ]
    );

    let rebuilt: Vec<_> = plan
        .entries()
        .iter()
        .map(|entry| build_track(&entry.xml))
        .collect();

    let first = rebuilt[0].as_ref().unwrap();
    assert_eq!(first.identity, EntityIdentity::new(1, 3101, 42));
    assert_eq!(first.custom_marking, "Viper 1");

    // The record without a timestamp line sorts by its event time
    let second = rebuilt[1].as_ref().unwrap();
    assert_eq!(second.identity, EntityIdentity::new(1, 3101, 43));
    assert_eq!(second.country_code, "RUS");

    // Heartbeat pings carry no entity identity
    assert!(rebuilt[2].is_err());
}

#[tokio::test]
async fn test_bridge_journal_then_replay() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cot_rx = UdpSocket::bind("127.0.0.1:0").await?;

    let mut config = AppConfig::from_file(fixtures_dir().join("config.yaml"))?;
    config.cot.port = cot_rx.local_addr()?.port();
    config.history.path = dir.path().join("history.log");

    let bridge = TrackBridge::new(config).await?;
    let bound = bridge.start().await?;
    let dis_addr = std::net::SocketAddr::from(([127, 0, 0, 1], bound.port()));

    let dis_tx = UdpSocket::bind("127.0.0.1:0").await?;
    for (entity, marking, lat) in [(1, "Lead", 48.85), (2, "Wing", 48.86)] {
        dis_tx.send_to(&tank_pdu(entity, marking, lat, 2.35), dis_addr).await?;
        let xml = recv_string(&cot_rx).await;
        assert!(xml.contains(&format!(r#"uid="Smoke-1:3101:{}""#, entity)));
        assert!(xml.contains(&format!(r#"callsign="{}""#, marking)));
    }
    bridge.shutdown();

    // The journal is appended right after each datagram leaves
    let path = bridge.config().history.path.clone();
    let deadline = tokio::time::Instant::now() + WAIT;
    let entries = loop {
        let entries = read_entries(&path).await?;
        if entries.len() == 2 || tokio::time::Instant::now() > deadline {
            break entries;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    assert_eq!(entries.len(), 2);

    let replay_rx = UdpSocket::bind("127.0.0.1:0").await?;
    let sender = CotSender::bind(replay_rx.local_addr()?, 1, None, TransportMetrics::new()).await?;
    let plan = ReplayPlan::new(entries, 100.0)?;

    let start = tokio::time::Instant::now();
    for (offset, entry) in plan.schedule() {
        tokio::time::sleep_until(start + offset).await;
        assert!(sender.send(&entry.xml).await);
    }

    for (entity, marking) in [(1, "Lead"), (2, "Wing")] {
        let track = build_track(&recv_string(&replay_rx).await)?;
        assert_eq!(track.identity, EntityIdentity::new(1, 3101, entity));
        assert_eq!(track.custom_marking, marking);
        assert_eq!(track.country_code, "USA");
        assert!(track.grid_ref.starts_with("31U"));
    }

    assert!(tokio::time::timeout(WAIT / 10, replay_rx.recv_from(&mut [0u8; 16]))
        .await
        .is_err());
    Ok(())
}
