//! FANTM alpha sensor support
//!
//! This module provides the complete alpha sensor pipeline including:
//! - BLE discovery and connection
//! - GATT service negotiation
//! - Telemetry packet decoding
//! - Activation signal publishing

pub mod bridge;
pub mod constants;
pub mod locator;
pub mod negotiator;
pub mod packet;
pub mod session;
pub mod signal;
pub mod types;

// Re-export commonly used items
pub use bridge::{BridgeStats, NotificationBridge, SubscriptionHandle};
pub use constants::*;
pub use locator::{select_by_name_substring, DeviceLocator};
pub use negotiator::{select_characteristic, ServiceNegotiator};
pub use packet::{DecodeError, TelemetryPacket};
pub use session::{ActiveSession, ConnectionSession, SessionError, SessionState};
pub use signal::{ActivationReader, ActivationSignal};
pub use types::*;
