//! Connection session
//!
//! Runs discovery, connection, GATT negotiation and subscription in order:
//!
//! ```text
//! Scanning -> Connecting -> NegotiatingServices -> Subscribed
//!     \            \                \
//!      +------------+----------------+--> Failed(reason)
//! ```
//!
//! There are no retries and no backward transitions. A failure at any stage
//! aborts [`ConnectionSession::establish`]; the caller is expected to stop.

use log::{error, info, warn};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::alpha::bridge::{BridgeStats, NotificationBridge, SubscriptionHandle};
use crate::alpha::constants::{ACTIVATION_THRESHOLD, DEFAULT_SCAN_TIMEOUT_MS};
use crate::alpha::locator::DeviceLocator;
use crate::alpha::negotiator::ServiceNegotiator;
use crate::alpha::signal::ActivationSignal;
use crate::alpha::types::{CharacteristicInfo, DeviceDescriptor, SessionTargets};
use crate::transport::{BleLink, BleTransport, TransportError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No device with a name containing '{target}' was found")]
    DeviceNotFound { target: String },

    #[error("Scan failed: {0}")]
    Scan(#[source] TransportError),

    #[error("Connection failed: {0}")]
    Connect(#[source] TransportError),

    #[error("Service discovery failed: {0}")]
    ServiceDiscovery(#[source] TransportError),

    #[error("No service matching '{target}'")]
    ServiceNotFound { target: String },

    #[error("No characteristic matching '{target}' in service '{service}'")]
    CharacteristicNotFound { service: String, target: String },

    #[error("Subscribing to notifications failed: {0}")]
    Subscribe(#[source] TransportError),

    #[error("Session is already {0}; a session is established at most once")]
    NotIdle(SessionState),
}

impl SessionError {
    /// Stage the session was in when this error occurred
    pub fn stage(&self) -> SessionState {
        match self {
            SessionError::DeviceNotFound { .. } | SessionError::Scan(_) => SessionState::Scanning,
            SessionError::Connect(_) => SessionState::Connecting,
            SessionError::ServiceDiscovery(_)
            | SessionError::ServiceNotFound { .. }
            | SessionError::CharacteristicNotFound { .. }
            | SessionError::Subscribe(_) => SessionState::NegotiatingServices,
            SessionError::NotIdle(state) => state.clone(),
        }
    }
}

/// Session lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Connecting,
    NegotiatingServices,
    Subscribed,
    Failed(String),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Scanning => f.write_str("scanning"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::NegotiatingServices => f.write_str("negotiating services"),
            SessionState::Subscribed => f.write_str("subscribed"),
            SessionState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Orchestrates one startup connection to the sensor
pub struct ConnectionSession<T: BleTransport> {
    transport: T,
    scan_timeout: Duration,
    threshold: u16,
    history: Vec<SessionState>,
}

impl<T: BleTransport> ConnectionSession<T> {
    /// Create a session over `transport` with default scan timeout and threshold
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            scan_timeout: Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS),
            threshold: ACTIVATION_THRESHOLD,
            history: vec![SessionState::Idle],
        }
    }

    /// Set how long discovery scans for
    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    /// Set the activation threshold used by the bridge
    pub fn with_threshold(mut self, threshold: u16) -> Self {
        self.threshold = threshold;
        self
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        // history always holds at least Idle
        &self.history[self.history.len() - 1]
    }

    /// Every state visited so far, oldest first
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Find, connect and subscribe to the sensor described by `targets`
    ///
    /// On success, `signal` is owned by the background notification task and
    /// updated on every decoded packet until the session is closed.
    ///
    /// Only an idle session can be established. Once it has succeeded or
    /// failed, further calls return [`SessionError::NotIdle`] and leave the
    /// state untouched.
    pub async fn establish(
        &mut self,
        targets: &SessionTargets,
        signal: ActivationSignal,
    ) -> Result<ActiveSession<T::Link>, SessionError> {
        if *self.state() != SessionState::Idle {
            let e = SessionError::NotIdle(self.state().clone());
            warn!("{}", e);
            return Err(e);
        }

        match self.run(targets, signal).await {
            Ok(session) => Ok(session),
            Err(e) => {
                error!("Session failed while {}: {}", e.stage(), e);
                self.transition(SessionState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        targets: &SessionTargets,
        signal: ActivationSignal,
    ) -> Result<ActiveSession<T::Link>, SessionError> {
        self.transition(SessionState::Scanning);
        let device = DeviceLocator::new(&self.transport)
            .locate(self.scan_timeout, &targets.device_name)
            .await?;
        info!("✓ Found device: {}", device);

        self.transition(SessionState::Connecting);
        let link = ServiceNegotiator::new(&self.transport).connect(&device).await?;

        self.transition(SessionState::NegotiatingServices);
        let negotiated = ServiceNegotiator::new(&self.transport)
            .find_characteristic(&link, &targets.service, &targets.characteristic)
            .await;
        let characteristic = match negotiated {
            Ok(characteristic) => characteristic,
            Err(e) => {
                release(&link, None).await;
                return Err(e);
            }
        };

        let address = device.address.clone();
        let bridge = NotificationBridge::new(signal, self.threshold);
        let subscribed = bridge
            .subscribe(&link, &characteristic, move |reason| {
                warn!("Device {} disconnected: {}", address, reason);
            })
            .await;
        let subscription = match subscribed {
            Ok(subscription) => subscription,
            Err(e) => {
                release(&link, None).await;
                return Err(SessionError::Subscribe(e));
            }
        };

        self.transition(SessionState::Subscribed);
        Ok(ActiveSession {
            device,
            characteristic,
            link,
            subscription,
        })
    }

    fn transition(&mut self, next: SessionState) {
        info!("Session: {} -> {}", self.state(), next);
        self.history.push(next);
    }
}

async fn release<L: BleLink>(link: &L, characteristic: Option<&CharacteristicInfo>) {
    if let Err(e) = link.disconnect(characteristic).await {
        warn!("Error disconnecting: {}", e);
    }
}

/// A live, subscribed session
///
/// Owns the connection and the notification task. Dropping it stops
/// notification processing; [`ActiveSession::close`] also disconnects.
pub struct ActiveSession<L: BleLink> {
    device: DeviceDescriptor,
    characteristic: CharacteristicInfo,
    link: L,
    subscription: SubscriptionHandle,
}

impl<L: BleLink> ActiveSession<L> {
    /// The connected device
    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    /// The characteristic notifications arrive on
    pub fn characteristic(&self) -> &CharacteristicInfo {
        &self.characteristic
    }

    /// Payload counters so far
    pub fn stats(&self) -> BridgeStats {
        self.subscription.stats()
    }

    /// Whether the notification stream is still open
    pub fn is_receiving(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop notifications, unsubscribe and disconnect
    pub async fn close(self) -> Result<(), TransportError> {
        let ActiveSession {
            device,
            characteristic,
            link,
            subscription,
        } = self;

        subscription.cancel();
        let stats = subscription.stats();
        info!(
            "Closing session with {}: {} packets decoded, {} dropped",
            device.display_name(),
            stats.decoded,
            stats.dropped
        );

        link.disconnect(Some(&characteristic)).await?;
        info!("✓ Disconnected successfully!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_stages() {
        let not_found = SessionError::DeviceNotFound { target: "FANTMalpha".into() };
        assert_eq!(not_found.stage(), SessionState::Scanning);

        let connect = SessionError::Connect(TransportError::Operation("refused".into()));
        assert_eq!(connect.stage(), SessionState::Connecting);

        let characteristic = SessionError::CharacteristicNotFound {
            service: "Nordic UART Service".into(),
            target: "Nordic UART TX".into(),
        };
        assert_eq!(characteristic.stage(), SessionState::NegotiatingServices);
    }

    #[test]
    fn test_error_messages_name_the_target() {
        let err = SessionError::ServiceNotFound { target: "Nordic UART Service".into() };
        assert!(err.to_string().contains("Nordic UART Service"));

        let err = SessionError::Connect(TransportError::Operation("refused".into()));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_not_idle_keeps_its_stage() {
        let err = SessionError::NotIdle(SessionState::Subscribed);
        assert_eq!(err.stage(), SessionState::Subscribed);
        assert!(err.to_string().contains("subscribed"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::NegotiatingServices.to_string(), "negotiating services");
        assert_eq!(SessionState::Failed("boom".into()).to_string(), "failed (boom)");
    }
}
