//! Device discovery
//!
//! Runs one time-bounded scan and picks the alpha sensor out of the
//! peripherals that answered, by advertised-name substring.

use log::{info, warn};
use std::time::Duration;

use crate::alpha::constants::SCAN_GRACE_MS;
use crate::alpha::session::SessionError;
use crate::alpha::types::DeviceDescriptor;
use crate::transport::BleTransport;

/// Scans for advertising peripherals through a transport
pub struct DeviceLocator<'a, T: BleTransport> {
    transport: &'a T,
}

impl<'a, T: BleTransport> DeviceLocator<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Scan for `timeout` and return every device seen, in discovery order
    ///
    /// A scan that overruns its timeout is abandoned and reports no devices,
    /// so selection afterwards fails closed.
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, SessionError> {
        info!("Scanning for devices ({} ms)...", timeout.as_millis());

        let limit = timeout + Duration::from_millis(SCAN_GRACE_MS);
        let devices = match tokio::time::timeout(limit, self.transport.discover(timeout)).await {
            Ok(result) => result.map_err(SessionError::Scan)?,
            Err(_) => {
                warn!("Scan did not finish within {} ms, giving up", limit.as_millis());
                if let Err(e) = self.transport.stop_discovery().await {
                    warn!("Failed to stop scan: {}", e);
                }
                Vec::new()
            }
        };

        for device in &devices {
            info!("  {}", device);
        }
        info!("Scan complete: {} device(s) found", devices.len());

        Ok(devices)
    }

    /// Scan, then select the first device whose name contains `name_substring`
    pub async fn locate(&self, timeout: Duration, name_substring: &str) -> Result<DeviceDescriptor, SessionError> {
        let devices = self.discover(timeout).await?;
        select_by_name_substring(&devices, name_substring)
    }
}

/// First device (in discovery order) whose advertised name contains `substring`
///
/// Devices without an advertised name never match.
pub fn select_by_name_substring(
    devices: &[DeviceDescriptor],
    substring: &str,
) -> Result<DeviceDescriptor, SessionError> {
    devices
        .iter()
        .find(|d| d.name.as_deref().is_some_and(|name| name.contains(substring)))
        .cloned()
        .ok_or_else(|| SessionError::DeviceNotFound {
            target: substring.to_string(),
        })
}
