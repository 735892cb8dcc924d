//! Notification bridge
//!
//! Decodes every notification from the sensor and publishes the derived
//! activation state. Runs on the async runtime, never on the control loop.

use futures::stream::StreamExt;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::alpha::packet::TelemetryPacket;
use crate::alpha::signal::ActivationSignal;
use crate::alpha::types::{CharacteristicInfo, DisconnectReason};
use crate::transport::{BleLink, TransportError};

/// Payload counters of one bridge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Payloads decoded and published
    pub decoded: u64,

    /// Malformed payloads dropped
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    decoded: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> BridgeStats {
        BridgeStats {
            decoded: self.decoded.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
        }
    }
}

/// Decode-and-publish handler for telemetry notifications
pub struct NotificationBridge {
    signal: ActivationSignal,
    threshold: u16,
    counters: Arc<Counters>,
}

impl NotificationBridge {
    /// Create a bridge that writes to `signal` using `threshold`
    pub fn new(signal: ActivationSignal, threshold: u16) -> Self {
        Self {
            signal,
            threshold,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Handle one notification payload
    ///
    /// Malformed payloads are dropped without touching the signal.
    pub fn handle_payload(&self, payload: &[u8]) -> Option<TelemetryPacket> {
        let packet = match TelemetryPacket::decode(payload) {
            Ok(packet) => packet,
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::SeqCst);
                debug!("Dropping notification: {}", e);
                return None;
            }
        };

        let activated = packet.is_activated(self.threshold);
        let previous = self.signal.get();
        self.signal.set(activated);

        let decoded = self.counters.decoded.fetch_add(1, Ordering::SeqCst) + 1;
        if decoded == 1 {
            info!("✓ First telemetry packet received: {:?}", packet);
        }
        if previous != activated {
            debug!("Activation {} (raw {})", if activated { "ON" } else { "OFF" }, packet.activation_raw);
        }

        Some(packet)
    }

    /// Current counters
    pub fn stats(&self) -> BridgeStats {
        self.counters.snapshot()
    }

    /// Current value of the published signal
    pub fn activated(&self) -> bool {
        self.signal.get()
    }

    /// Subscribe to `characteristic` and process its notifications in the background
    ///
    /// `on_disconnect` is called for every disconnect notice; it does not stop
    /// the bridge, and the signal keeps its last value.
    pub async fn subscribe<L, F>(
        self,
        link: &L,
        characteristic: &CharacteristicInfo,
        on_disconnect: F,
    ) -> Result<SubscriptionHandle, TransportError>
    where
        L: BleLink,
        F: Fn(DisconnectReason) + Send + 'static,
    {
        let watcher = match link.disconnect_events().await {
            Ok(mut events) => Some(tokio::spawn(async move {
                while let Some(reason) = events.next().await {
                    on_disconnect(reason);
                }
            })),
            Err(e) => {
                warn!("Disconnect notices unavailable: {}", e);
                None
            }
        };

        let mut payloads = match link.subscribe(characteristic).await {
            Ok(payloads) => payloads,
            Err(e) => {
                if let Some(watcher) = watcher {
                    watcher.abort();
                }
                return Err(e);
            }
        };
        info!("Listening for notifications on {}", characteristic.description);

        let counters = Arc::clone(&self.counters);
        let notifications = tokio::spawn(async move {
            while let Some(payload) = payloads.next().await {
                self.handle_payload(&payload);
            }
            debug!("Notification stream ended");
        });

        Ok(SubscriptionHandle {
            notifications,
            watcher,
            counters,
        })
    }
}

/// Background tasks of a live subscription; aborted on drop
pub struct SubscriptionHandle {
    notifications: JoinHandle<()>,
    watcher: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl SubscriptionHandle {
    /// Counters of the bridge feeding this subscription
    pub fn stats(&self) -> BridgeStats {
        self.counters.snapshot()
    }

    /// Whether notifications are still being processed
    pub fn is_active(&self) -> bool {
        !self.notifications.is_finished()
    }

    /// Stop processing notifications and disconnect notices
    pub fn cancel(&self) {
        self.notifications.abort();
        if let Some(watcher) = &self.watcher {
            watcher.abort();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
