//! Alpha-link: FANTM alpha sensor to control loop bridge
//!
//! This library finds a FANTM alpha motion sensor over Bluetooth Low Energy,
//! subscribes to its Nordic UART telemetry stream, and exposes a single
//! "activated" flag that a tick-driven control loop can poll.

pub mod alpha;
pub mod config;
pub mod control;
pub mod transport;

// Re-export commonly used items
pub use alpha::{
    ActivationReader, ActivationSignal, ActiveSession, ConnectionSession, SessionError, SessionTargets,
    TelemetryPacket,
};
pub use config::{Config, ConfigError};
pub use control::{ActivationEdge, TickLoop};
pub use transport::{BleLink, BleTransport, BtleplugTransport, MockTransport};
