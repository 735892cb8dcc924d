//! Integration tests for notification handling through a live session

mod common;

use alpha_link::alpha::{ActivationSignal, ConnectionSession, SessionTargets};
use common::{alpha_transport, init_logging, packet, wait_until};
use std::time::Duration;

#[tokio::test]
async fn test_packets_drive_signal() {
    init_logging();

    let transport = alpha_transport();
    let feeder = transport.feeder();
    let mut session = ConnectionSession::new(transport).with_scan_timeout(Duration::from_millis(10));

    let signal = ActivationSignal::new();
    let reader = signal.reader();
    let active = session.establish(&SessionTargets::default(), signal).await.unwrap();
    assert!(!reader.get());

    feeder.push_packet(&packet(101));
    assert!(wait_until(|| active.stats().decoded == 1).await);
    assert!(reader.get());

    feeder.push_packet(&packet(100));
    assert!(wait_until(|| active.stats().decoded == 2).await);
    assert!(!reader.get());
}

#[tokio::test]
async fn test_malformed_packet_has_no_effect() {
    init_logging();

    let transport = alpha_transport();
    let feeder = transport.feeder();
    let mut session = ConnectionSession::new(transport).with_scan_timeout(Duration::from_millis(10));

    let signal = ActivationSignal::new();
    let reader = signal.reader();
    let active = session.establish(&SessionTargets::default(), signal).await.unwrap();

    feeder.push(vec![0xFF; 7]);
    feeder.push_packet(&packet(500));
    assert!(wait_until(|| active.stats().decoded == 1).await);

    assert!(reader.get());
    assert_eq!(active.stats().dropped, 1);
    assert!(active.is_receiving());
}

#[tokio::test]
async fn test_disconnect_freezes_last_state() {
    init_logging();

    let transport = alpha_transport();
    let feeder = transport.feeder();
    let mut session = ConnectionSession::new(transport).with_scan_timeout(Duration::from_millis(10));

    let signal = ActivationSignal::new();
    let reader = signal.reader();
    let active = session.establish(&SessionTargets::default(), signal).await.unwrap();

    feeder.push_packet(&packet(900));
    assert!(wait_until(|| active.stats().decoded == 1).await);

    feeder.disconnect("link supervision timeout");
    tokio::time::sleep(Duration::from_millis(20)).await;

    // No further packets: the last decoded state is retained
    assert!(reader.get());
    assert_eq!(active.stats().decoded, 1);
}

#[tokio::test]
async fn test_custom_threshold() {
    init_logging();

    let transport = alpha_transport();
    let feeder = transport.feeder();
    let mut session = ConnectionSession::new(transport)
        .with_scan_timeout(Duration::from_millis(10))
        .with_threshold(1000);

    let signal = ActivationSignal::new();
    let reader = signal.reader();
    let active = session.establish(&SessionTargets::default(), signal).await.unwrap();

    feeder.push_packet(&packet(500));
    assert!(wait_until(|| active.stats().decoded == 1).await);
    assert!(!reader.get());

    feeder.push_packet(&packet(1001));
    assert!(wait_until(|| active.stats().decoded == 2).await);
    assert!(reader.get());
}
