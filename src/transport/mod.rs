//! Transport abstraction for BLE central operations
//!
//! This module provides a unified interface over the Bluetooth stack so the
//! session stages can run against real hardware or an in-memory mock.

pub mod mock;
pub mod platform;

pub use mock::{MockFeeder, MockLink, MockTransport};
pub use platform::{BtleplugLink, BtleplugTransport};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

use crate::alpha::types::{CharacteristicInfo, DeviceDescriptor, DisconnectReason, ServiceInfo};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    #[error("No Bluetooth adapters found")]
    NoAdapter,

    #[error("Peripheral {0} is no longer known to the adapter")]
    UnknownPeripheral(String),

    #[error("Characteristic {0} is not present on the peripheral")]
    UnknownCharacteristic(uuid::Uuid),

    #[error("Transport operation failed: {0}")]
    Operation(String),
}

/// Raw notification payloads of one characteristic, in delivery order
pub type PayloadStream = BoxStream<'static, Vec<u8>>;

/// Disconnect notices for one peripheral
pub type DisconnectStream = BoxStream<'static, DisconnectReason>;

/// BLE central: discovers and connects peripherals
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// Connected peripheral type produced by [`BleTransport::connect`]
    type Link: BleLink + 'static;

    /// Scan for `timeout`, then report every peripheral seen, in discovery order
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, TransportError>;

    /// End a scan that was abandoned before [`BleTransport::discover`] returned
    async fn stop_discovery(&self) -> Result<(), TransportError>;

    /// Make exactly one connection attempt
    async fn connect(&self, device: &DeviceDescriptor) -> Result<Self::Link, TransportError>;
}

/// A connected peripheral
#[async_trait]
pub trait BleLink: Send + Sync {
    /// Enumerate the GATT service tree
    async fn services(&self) -> Result<Vec<ServiceInfo>, TransportError>;

    /// Enable notifications on `characteristic` and stream its values
    async fn subscribe(&self, characteristic: &CharacteristicInfo) -> Result<PayloadStream, TransportError>;

    /// Stream of disconnect notices for this peripheral
    async fn disconnect_events(&self) -> Result<DisconnectStream, TransportError>;

    /// Best-effort teardown: unsubscribe from `characteristic` and drop the link
    async fn disconnect(&self, characteristic: Option<&CharacteristicInfo>) -> Result<(), TransportError>;
}
