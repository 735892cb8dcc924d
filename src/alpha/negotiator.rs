//! Connection and GATT negotiation
//!
//! Makes the single connection attempt and walks the peripheral's service
//! tree to find the serial-transport characteristic telemetry arrives on.

use log::{debug, info};

use crate::alpha::session::SessionError;
use crate::alpha::types::{CharacteristicInfo, DeviceDescriptor, ServiceInfo};
use crate::transport::{BleLink, BleTransport};

/// Connects to a discovered device and locates its characteristics
pub struct ServiceNegotiator<'a, T: BleTransport> {
    transport: &'a T,
}

impl<'a, T: BleTransport> ServiceNegotiator<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Connect to `device`; exactly one attempt, no retry
    pub async fn connect(&self, device: &DeviceDescriptor) -> Result<T::Link, SessionError> {
        info!("Connecting to {}...", device);
        let link = self
            .transport
            .connect(device)
            .await
            .map_err(SessionError::Connect)?;
        info!("✓ Connected to {}", device.display_name());
        Ok(link)
    }

    /// Enumerate the service tree once and select the characteristic
    /// `characteristic_substring` inside the service `service_substring`
    pub async fn find_characteristic(
        &self,
        link: &T::Link,
        service_substring: &str,
        characteristic_substring: &str,
    ) -> Result<CharacteristicInfo, SessionError> {
        info!("Discovering services...");
        let services = link.services().await.map_err(SessionError::ServiceDiscovery)?;
        select_characteristic(&services, service_substring, characteristic_substring)
    }
}

/// Pick the first service whose description contains `service_substring`,
/// then the first characteristic in it whose description contains
/// `characteristic_substring`. No fallback search across other services.
pub fn select_characteristic(
    services: &[ServiceInfo],
    service_substring: &str,
    characteristic_substring: &str,
) -> Result<CharacteristicInfo, SessionError> {
    for service in services {
        debug!("  Service {}", service);
    }

    let service = services
        .iter()
        .find(|s| s.description.contains(service_substring))
        .ok_or_else(|| SessionError::ServiceNotFound {
            target: service_substring.to_string(),
        })?;
    info!("✓ Found service: {}", service);

    for characteristic in &service.characteristics {
        debug!("  Characteristic {} (notify: {})", characteristic, characteristic.notify);
    }

    let characteristic = service
        .characteristics
        .iter()
        .find(|c| c.description.contains(characteristic_substring))
        .cloned()
        .ok_or_else(|| SessionError::CharacteristicNotFound {
            service: service.description.clone(),
            target: characteristic_substring.to_string(),
        })?;
    info!("✓ Found characteristic: {}", characteristic);

    Ok(characteristic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alpha::constants::{NUS_SERVICE_UUID, NUS_TX_CHARACTERISTIC_UUID};
    use crate::transport::mock::nordic_uart_services;

    #[test]
    fn test_select_nordic_uart_tx() {
        let services = nordic_uart_services();
        let characteristic = select_characteristic(&services, "Nordic UART Service", "Nordic UART TX").unwrap();

        assert_eq!(characteristic.uuid, NUS_TX_CHARACTERISTIC_UUID);
        assert_eq!(characteristic.service_uuid, NUS_SERVICE_UUID);
        assert!(characteristic.notify);
    }

    #[test]
    fn test_missing_service() {
        let services = nordic_uart_services();
        let result = select_characteristic(&services, "Heart Rate", "Nordic UART TX");
        assert!(matches!(result, Err(SessionError::ServiceNotFound { .. })));
    }

    #[test]
    fn test_missing_characteristic() {
        let services = nordic_uart_services();
        let result = select_characteristic(&services, "Nordic UART Service", "Battery Level");
        assert!(matches!(result, Err(SessionError::CharacteristicNotFound { .. })));
    }

    #[test]
    fn test_characteristic_not_searched_in_other_services() {
        // "Device Name" lives in GAP, not in the Nordic UART Service
        let services = nordic_uart_services();
        let result = select_characteristic(&services, "Nordic UART Service", "Device Name");
        assert!(matches!(result, Err(SessionError::CharacteristicNotFound { .. })));
    }
}
