//! Activation signal shared between the notification handler and the control loop
//!
//! The writer half ([`ActivationSignal`]) is owned by the notification bridge;
//! any number of read-only [`ActivationReader`] handles can be given to the
//! control loop. Both sides touch a single atomic boolean, so reads never block
//! and never observe a partial write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Writer half of the activation flag
///
/// Not `Clone`: there is exactly one writer.
#[derive(Debug, Default)]
pub struct ActivationSignal {
    activated: Arc<AtomicBool>,
}

impl ActivationSignal {
    /// Create a new signal, initially not activated
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new activation state, overwriting the previous one
    pub fn set(&self, activated: bool) {
        self.activated.store(activated, Ordering::SeqCst);
    }

    /// Snapshot of the most recently published state
    pub fn get(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }

    /// Create a read-only handle for the consuming side
    pub fn reader(&self) -> ActivationReader {
        ActivationReader {
            activated: Arc::clone(&self.activated),
        }
    }
}

/// Read-only handle to the activation flag
#[derive(Debug, Clone)]
pub struct ActivationReader {
    activated: Arc<AtomicBool>,
}

impl ActivationReader {
    /// Snapshot of the most recently published state
    pub fn get(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initially_false() {
        let signal = ActivationSignal::new();
        assert!(!signal.get());
        assert!(!signal.reader().get());
    }

    #[test]
    fn test_reader_sees_latest_write() {
        let signal = ActivationSignal::new();
        let reader = signal.reader();

        signal.set(true);
        assert!(reader.get());
        // Repeated reads without a write return the same value
        assert!(reader.get());

        signal.set(false);
        assert!(!reader.get());
    }

    #[test]
    fn test_reader_across_threads() {
        let signal = ActivationSignal::new();
        let reader = signal.reader();

        let writer = thread::spawn(move || {
            signal.set(true);
            signal
        });
        let signal = writer.join().unwrap();

        let observer = thread::spawn(move || reader.get());
        assert!(observer.join().unwrap());
        assert!(signal.get());
    }
}
