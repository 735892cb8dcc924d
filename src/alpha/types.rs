//! Alpha sensor type definitions
//!
//! This module defines the plain data types passed between the transport and
//! the session stages: discovered devices, the GATT tree, and disconnect notices.

use std::fmt;
use uuid::Uuid;

use crate::alpha::constants::{
    DEFAULT_CHARACTERISTIC_DESCRIPTION, DEFAULT_DEVICE_NAME, DEFAULT_SERVICE_DESCRIPTION,
};

/// A peripheral seen during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Transport-specific identifier used to connect
    pub id: String,

    /// Advertised local name, if the peripheral sent one
    pub name: Option<String>,

    /// Bluetooth address (string format like "AA:BB:CC:DD:EE:FF")
    pub address: String,

    /// Signal strength at discovery time
    pub rssi: Option<i16>,
}

impl DeviceDescriptor {
    /// Create a descriptor with no signal strength reading
    pub fn new(id: impl Into<String>, name: Option<&str>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            address: address.into(),
            rssi: None,
        }
    }

    /// Advertised name, or "Unknown"
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.address, self.display_name())?;
        if let Some(rssi) = self.rssi {
            write!(f, " ({} dBm)", rssi)?;
        }
        Ok(())
    }
}

/// A GATT characteristic of a connected peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,

    /// UUID of the service this characteristic belongs to
    pub service_uuid: Uuid,

    /// Human-readable description resolved from the UUID
    pub description: String,

    /// Whether the characteristic supports notifications
    pub notify: bool,
}

impl fmt::Display for CharacteristicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.uuid, self.description)
    }
}

/// A GATT service with its characteristics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub uuid: Uuid,

    /// Human-readable description resolved from the UUID
    pub description: String,

    pub characteristics: Vec<CharacteristicInfo>,
}

impl fmt::Display for ServiceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.uuid, self.description)
    }
}

/// Why the transport reported the peripheral as gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason(pub String);

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a session looks for at each stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTargets {
    /// Substring of the advertised device name
    pub device_name: String,

    /// Substring of the service description
    pub service: String,

    /// Substring of the characteristic description
    pub characteristic: String,
}

impl SessionTargets {
    pub fn new(
        device_name: impl Into<String>,
        service: impl Into<String>,
        characteristic: impl Into<String>,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            service: service.into(),
            characteristic: characteristic.into(),
        }
    }
}

impl Default for SessionTargets {
    fn default() -> Self {
        Self::new(
            DEFAULT_DEVICE_NAME,
            DEFAULT_SERVICE_DESCRIPTION,
            DEFAULT_CHARACTERISTIC_DESCRIPTION,
        )
    }
}
