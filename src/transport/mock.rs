//! Mock BLE transport for testing.
//!
//! This transport simulates a peripheral in memory instead of talking to a
//! Bluetooth adapter. Useful for exercising the session stages and the
//! notification bridge without hardware. Payloads and disconnect notices are
//! injected through a [`MockFeeder`].

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::stream::StreamExt;
use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use super::{BleLink, BleTransport, DisconnectStream, PayloadStream, TransportError};
use crate::alpha::constants::{
    describe_uuid, sig_uuid, NUS_RX_CHARACTERISTIC_UUID, NUS_SERVICE_UUID, NUS_TX_CHARACTERISTIC_UUID,
};
use crate::alpha::packet::TelemetryPacket;
use crate::alpha::types::{CharacteristicInfo, DeviceDescriptor, DisconnectReason, ServiceInfo};

/// Mock transport that serves a fixed device list and service tree.
pub struct MockTransport {
    devices: Vec<DeviceDescriptor>,
    services: Vec<ServiceInfo>,
    connect_failure: Option<String>,
    scan_delay: Option<Duration>,
    connect_attempts: AtomicUsize,
    stop_discovery_calls: AtomicUsize,
    disconnect_calls: Arc<AtomicUsize>,
    payloads: Mutex<Option<UnboundedReceiver<Vec<u8>>>>,
    disconnects: Mutex<Option<UnboundedReceiver<DisconnectReason>>>,
    feeder: MockFeeder,
}

impl MockTransport {
    /// Create a mock that advertises `devices` and exposes a Nordic UART tree
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        let (payload_tx, payload_rx) = unbounded();
        let (disconnect_tx, disconnect_rx) = unbounded();

        Self {
            devices,
            services: nordic_uart_services(),
            connect_failure: None,
            scan_delay: None,
            connect_attempts: AtomicUsize::new(0),
            stop_discovery_calls: AtomicUsize::new(0),
            disconnect_calls: Arc::new(AtomicUsize::new(0)),
            payloads: Mutex::new(Some(payload_rx)),
            disconnects: Mutex::new(Some(disconnect_rx)),
            feeder: MockFeeder {
                payloads: payload_tx,
                disconnects: disconnect_tx,
            },
        }
    }

    /// Replace the service tree the peripheral exposes
    pub fn with_services(mut self, services: Vec<ServiceInfo>) -> Self {
        self.services = services;
        self
    }

    /// Make every connection attempt fail with `reason`
    pub fn with_connect_failure(mut self, reason: impl Into<String>) -> Self {
        self.connect_failure = Some(reason.into());
        self
    }

    /// Make discovery take `delay` regardless of the requested timeout
    pub fn with_scan_delay(mut self, delay: Duration) -> Self {
        self.scan_delay = Some(delay);
        self
    }

    /// Handle for injecting payloads and disconnects
    pub fn feeder(&self) -> MockFeeder {
        self.feeder.clone()
    }

    /// Number of connection attempts made so far
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of times an abandoned scan was stopped
    pub fn stop_discovery_calls(&self) -> usize {
        self.stop_discovery_calls.load(Ordering::SeqCst)
    }

    /// Number of times a link was torn down
    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BleTransport for MockTransport {
    type Link = MockLink;

    async fn discover(&self, _timeout: Duration) -> Result<Vec<DeviceDescriptor>, TransportError> {
        info!("[MOCK BLE] Discover: {} devices", self.devices.len());
        if let Some(delay) = self.scan_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.devices.clone())
    }

    async fn stop_discovery(&self) -> Result<(), TransportError> {
        info!("[MOCK BLE] Stop discovery");
        self.stop_discovery_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn connect(&self, device: &DeviceDescriptor) -> Result<Self::Link, TransportError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        info!("[MOCK BLE] Connect: {}", device);

        if let Some(reason) = &self.connect_failure {
            return Err(TransportError::Operation(reason.clone()));
        }

        Ok(MockLink {
            services: self.services.clone(),
            payloads: Mutex::new(take(&self.payloads)),
            disconnects: Mutex::new(take(&self.disconnects)),
            disconnect_calls: Arc::clone(&self.disconnect_calls),
        })
    }
}

/// Peripheral connected through [`MockTransport`]
pub struct MockLink {
    services: Vec<ServiceInfo>,
    payloads: Mutex<Option<UnboundedReceiver<Vec<u8>>>>,
    disconnects: Mutex<Option<UnboundedReceiver<DisconnectReason>>>,
    disconnect_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl BleLink for MockLink {
    async fn services(&self) -> Result<Vec<ServiceInfo>, TransportError> {
        Ok(self.services.clone())
    }

    async fn subscribe(&self, characteristic: &CharacteristicInfo) -> Result<PayloadStream, TransportError> {
        let known = self
            .services
            .iter()
            .flat_map(|s| &s.characteristics)
            .any(|c| c == characteristic);
        if !known {
            return Err(TransportError::UnknownCharacteristic(characteristic.uuid));
        }

        info!("[MOCK BLE] Subscribe: {}", characteristic);
        take(&self.payloads)
            .map(|rx| rx.boxed())
            .ok_or_else(|| TransportError::Operation("notification stream already taken".into()))
    }

    async fn disconnect_events(&self) -> Result<DisconnectStream, TransportError> {
        take(&self.disconnects)
            .map(|rx| rx.boxed())
            .ok_or_else(|| TransportError::Operation("disconnect stream already taken".into()))
    }

    async fn disconnect(&self, _characteristic: Option<&CharacteristicInfo>) -> Result<(), TransportError> {
        info!("[MOCK BLE] Disconnect");
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Injects traffic into a [`MockTransport`]
#[derive(Clone)]
pub struct MockFeeder {
    payloads: UnboundedSender<Vec<u8>>,
    disconnects: UnboundedSender<DisconnectReason>,
}

impl MockFeeder {
    /// Deliver a raw notification payload
    pub fn push(&self, payload: impl Into<Vec<u8>>) {
        let _ = self.payloads.unbounded_send(payload.into());
    }

    /// Deliver an encoded telemetry packet
    pub fn push_packet(&self, packet: &TelemetryPacket) {
        self.push(packet.encode().to_vec());
    }

    /// Report the peripheral as disconnected
    pub fn disconnect(&self, reason: impl Into<String>) {
        let _ = self.disconnects.unbounded_send(DisconnectReason(reason.into()));
    }
}

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}

/// Service tree of an alpha sensor: GAP plus the Nordic UART Service
pub fn nordic_uart_services() -> Vec<ServiceInfo> {
    let characteristic = |uuid: Uuid, service_uuid: Uuid, notify: bool| CharacteristicInfo {
        uuid,
        service_uuid,
        description: describe_uuid(&uuid).to_string(),
        notify,
    };

    let gap = sig_uuid(0x1800);

    vec![
        ServiceInfo {
            uuid: gap,
            description: describe_uuid(&gap).to_string(),
            characteristics: vec![characteristic(sig_uuid(0x2a00), gap, false)],
        },
        ServiceInfo {
            uuid: NUS_SERVICE_UUID,
            description: describe_uuid(&NUS_SERVICE_UUID).to_string(),
            characteristics: vec![
                characteristic(NUS_RX_CHARACTERISTIC_UUID, NUS_SERVICE_UUID, false),
                characteristic(NUS_TX_CHARACTERISTIC_UUID, NUS_SERVICE_UUID, true),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_connect_counts_attempts() {
        let transport = MockTransport::new(vec![DeviceDescriptor::new("1", Some("FANTMalpha-1"), "AA")])
            .with_connect_failure("out of range");

        let device = transport.discover(Duration::from_millis(1)).await.unwrap().remove(0);
        assert!(transport.connect(&device).await.is_err());
        assert_eq!(transport.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn mock_stream_delivers_in_order() {
        let transport = MockTransport::new(vec![DeviceDescriptor::new("1", Some("FANTMalpha-1"), "AA")]);
        let feeder = transport.feeder();
        let device = transport.discover(Duration::from_millis(1)).await.unwrap().remove(0);
        let link = transport.connect(&device).await.unwrap();

        let tx = link.services().await.unwrap()[1].characteristics[1].clone();
        let mut stream = link.subscribe(&tx).await.unwrap();

        feeder.push(vec![1]);
        feeder.push(vec![2]);
        assert_eq!(stream.next().await, Some(vec![1]));
        assert_eq!(stream.next().await, Some(vec![2]));

        // A second subscription has nothing left to hand out
        assert!(link.subscribe(&tx).await.is_err());
    }
}
