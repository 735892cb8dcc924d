//! FANTM alpha protocol constants
//!
//! This module contains all the constants needed for alpha sensor communication:
//! - Default discovery targets
//! - Nordic UART Service UUIDs and the GATT description table
//! - Telemetry payload layout
//! - Timing constants

use uuid::Uuid;

// ============================================================================
// Discovery Targets
// ============================================================================

/// Marker contained in the advertised name of every alpha sensor
pub const DEFAULT_DEVICE_NAME: &str = "FANTMalpha";

/// Description of the serial-over-BLE service the sensor streams on
pub const DEFAULT_SERVICE_DESCRIPTION: &str = "Nordic UART Service";

/// Description of the inbound (device -> host) characteristic of that service
pub const DEFAULT_CHARACTERISTIC_DESCRIPTION: &str = "Nordic UART TX";

// ============================================================================
// Nordic UART Service UUIDs
// ============================================================================

/// Nordic UART Service
pub const NUS_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);

/// RX characteristic (host -> device, write)
pub const NUS_RX_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e);

/// TX characteristic (device -> host, notify)
/// This is the characteristic telemetry packets arrive on
pub const NUS_TX_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x6e400003_b5a3_f393_e0a9_e50e24dcca9e);

/// Bluetooth SIG base UUID, used to expand 16-bit assigned numbers
const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Expand a 16-bit SIG assigned number into a full UUID
pub const fn sig_uuid(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Description reported for UUIDs missing from the table below
pub const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// Vendor-specific UUIDs with known descriptions
const VENDOR_DESCRIPTIONS: &[(Uuid, &str)] = &[
    (NUS_SERVICE_UUID, "Nordic UART Service"),
    (NUS_RX_CHARACTERISTIC_UUID, "Nordic UART RX"),
    (NUS_TX_CHARACTERISTIC_UUID, "Nordic UART TX"),
];

/// SIG assigned numbers the sensor (or common peripherals) expose
const SIG_DESCRIPTIONS: &[(u16, &str)] = &[
    (0x1800, "Generic Access Profile"),
    (0x1801, "Generic Attribute Profile"),
    (0x180a, "Device Information"),
    (0x180f, "Battery Service"),
    (0x2a00, "Device Name"),
    (0x2a01, "Appearance"),
    (0x2a04, "Peripheral Preferred Connection Parameters"),
    (0x2a05, "Service Changed"),
    (0x2a19, "Battery Level"),
    (0x2a24, "Model Number String"),
    (0x2a25, "Serial Number String"),
    (0x2a26, "Firmware Revision String"),
    (0x2a27, "Hardware Revision String"),
    (0x2a28, "Software Revision String"),
    (0x2a29, "Manufacturer Name String"),
];

/// Human-readable description of a GATT service or characteristic UUID
///
/// BLE does not transmit names for services, so selection by description goes
/// through this table. Unlisted UUIDs are described as [`UNKNOWN_DESCRIPTION`].
pub fn describe_uuid(uuid: &Uuid) -> &'static str {
    if let Some((_, description)) = VENDOR_DESCRIPTIONS.iter().find(|(u, _)| u == uuid) {
        return description;
    }

    SIG_DESCRIPTIONS
        .iter()
        .find(|(short, _)| sig_uuid(*short) == *uuid)
        .map(|(_, description)| *description)
        .unwrap_or(UNKNOWN_DESCRIPTION)
}

// ============================================================================
// Telemetry Payload
// ============================================================================

/// Exact size of one telemetry notification (ten i16 + one u16, big-endian)
pub const PACKET_LEN: usize = 22;

/// Raw activation reading above which the sensor counts as triggered
pub const ACTIVATION_THRESHOLD: u16 = 100;

// ============================================================================
// Timing Constants
// ============================================================================

/// Default scan duration (milliseconds)
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 5_000;

/// Extra time a scan may take past its requested duration before it is abandoned
pub const SCAN_GRACE_MS: u64 = 2_000;

/// Default control loop rate (ticks per second)
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
