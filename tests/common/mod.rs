//! Shared helpers for integration tests

#![allow(dead_code)]

use alpha_link::alpha::{DeviceDescriptor, TelemetryPacket};
use alpha_link::transport::MockTransport;
use std::time::Duration;

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Devices named in order, addresses derived from the index
pub fn devices(names: &[&str]) -> Vec<DeviceDescriptor> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| DeviceDescriptor::new(format!("dev-{}", i), Some(*name), format!("C0:FF:EE:00:00:{:02X}", i)))
        .collect()
}

/// A mock advertising one alpha sensor among other devices
pub fn alpha_transport() -> MockTransport {
    MockTransport::new(devices(&["Foo", "FANTMalpha-1", "Bar"]))
}

pub fn packet(activation_raw: u16) -> TelemetryPacket {
    TelemetryPacket {
        accel_x: 12,
        accel_y: -40,
        accel_z: 1010,
        temp: 24,
        activation_raw,
        ..Default::default()
    }
}

/// Poll `condition` until it holds or a second passes
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
