//! Real BLE transport backed by btleplug
//!
//! Uses the first Bluetooth adapter reported by the platform manager.

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::future;
use futures::stream::StreamExt;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use super::{BleLink, BleTransport, DisconnectStream, PayloadStream, TransportError};
use crate::alpha::constants::describe_uuid;
use crate::alpha::types::{CharacteristicInfo, DeviceDescriptor, DisconnectReason, ServiceInfo};

/// BLE central on the host's first Bluetooth adapter
pub struct BtleplugTransport {
    adapter: Adapter,
}

impl BtleplugTransport {
    /// Open the first available adapter
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;

        let adapter = adapters.into_iter().next().ok_or(TransportError::NoAdapter)?;

        match adapter.adapter_info().await {
            Ok(info) => info!("Using Bluetooth adapter: {}", info),
            Err(e) => debug!("Could not read adapter info: {}", e),
        }

        Ok(Self { adapter })
    }

    async fn find_peripheral(&self, id: &str) -> Result<Peripheral, TransportError> {
        self.adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.id().to_string() == id)
            .ok_or_else(|| TransportError::UnknownPeripheral(id.to_string()))
    }
}

#[async_trait]
impl BleTransport for BtleplugTransport {
    type Link = BtleplugLink;

    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        // Record the order peripherals first show up in
        let mut order: Vec<PeripheralId> = Vec::new();
        let deadline = Instant::now() + timeout;
        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(CentralEvent::DeviceDiscovered(id)) => {
                        if !order.contains(&id) {
                            order.push(id);
                        }
                    }
                    Some(_) => {}
                    None => {
                        sleep_until(deadline).await;
                        break;
                    }
                },
                _ = sleep_until(deadline) => break,
            }
        }

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        let mut peripherals = self.adapter.peripherals().await?;
        peripherals.sort_by_key(|p| {
            let id = p.id();
            order.iter().position(|seen| *seen == id).unwrap_or(usize::MAX)
        });

        let mut devices = Vec::with_capacity(peripherals.len());
        for peripheral in peripherals {
            let properties = match peripheral.properties().await {
                Ok(Some(properties)) => properties,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping peripheral without properties: {}", e);
                    continue;
                }
            };

            devices.push(DeviceDescriptor {
                id: peripheral.id().to_string(),
                name: properties.local_name,
                address: properties.address.to_string(),
                rssi: properties.rssi,
            });
        }

        Ok(devices)
    }

    async fn stop_discovery(&self) -> Result<(), TransportError> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&self, device: &DeviceDescriptor) -> Result<Self::Link, TransportError> {
        let peripheral = self.find_peripheral(&device.id).await?;
        peripheral.connect().await?;

        Ok(BtleplugLink {
            adapter: self.adapter.clone(),
            peripheral,
            address: device.address.clone(),
        })
    }
}

/// A peripheral connected through btleplug
pub struct BtleplugLink {
    adapter: Adapter,
    peripheral: Peripheral,
    address: String,
}

impl BtleplugLink {
    fn find_characteristic(&self, info: &CharacteristicInfo) -> Result<Characteristic, TransportError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == info.uuid && c.service_uuid == info.service_uuid)
            .ok_or(TransportError::UnknownCharacteristic(info.uuid))
    }
}

#[async_trait]
impl BleLink for BtleplugLink {
    async fn services(&self) -> Result<Vec<ServiceInfo>, TransportError> {
        // BlueZ reports the connection before its GATT cache is populated
        #[cfg(target_os = "linux")]
        tokio::time::sleep(Duration::from_millis(600)).await;

        self.peripheral.discover_services().await?;

        let services = self
            .peripheral
            .services()
            .into_iter()
            .map(|service| ServiceInfo {
                uuid: service.uuid,
                description: describe_uuid(&service.uuid).to_string(),
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|c| CharacteristicInfo {
                        uuid: c.uuid,
                        service_uuid: c.service_uuid,
                        description: describe_uuid(&c.uuid).to_string(),
                        notify: c.properties.contains(CharPropFlags::NOTIFY),
                    })
                    .collect(),
            })
            .collect();

        Ok(services)
    }

    async fn subscribe(&self, characteristic: &CharacteristicInfo) -> Result<PayloadStream, TransportError> {
        let target = self.find_characteristic(characteristic)?;

        // Open the stream first so the earliest notifications are not missed
        let notifications = self.peripheral.notifications().await?;
        self.peripheral.subscribe(&target).await?;
        debug!("Subscribed to {} notifications", characteristic.description);

        let uuid = characteristic.uuid;
        Ok(notifications
            .filter(move |n| future::ready(n.uuid == uuid))
            .map(|n| n.value)
            .boxed())
    }

    async fn disconnect_events(&self) -> Result<DisconnectStream, TransportError> {
        let id = self.peripheral.id();
        let address = self.address.clone();
        let events = self.adapter.events().await?;

        Ok(events
            .filter_map(move |event| {
                let notice = match event {
                    CentralEvent::DeviceDisconnected(gone) if gone == id => {
                        Some(DisconnectReason(format!("Peripheral {} disconnected", address)))
                    }
                    _ => None,
                };
                future::ready(notice)
            })
            .boxed())
    }

    async fn disconnect(&self, characteristic: Option<&CharacteristicInfo>) -> Result<(), TransportError> {
        if let Some(characteristic) = characteristic {
            if let Ok(target) = self.find_characteristic(characteristic) {
                if let Err(e) = self.peripheral.unsubscribe(&target).await {
                    warn!("Error unsubscribing from {}: {}", characteristic.description, e);
                }
            }
        }

        self.peripheral.disconnect().await?;
        Ok(())
    }
}
