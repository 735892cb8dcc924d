//! Tick-driven control loop
//!
//! Reference consumer of the activation signal. It runs on its own thread at a
//! fixed rate, polls the signal once per tick, and turns level changes into
//! press/release edges (a held activation fires once, like a mouse button).

use log::{debug, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::alpha::signal::ActivationReader;

/// Change of the activation level between two ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationEdge {
    Pressed,
    Released,
}

/// Latches the previous level and reports edges
#[derive(Debug, Default)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current level; returns an edge when it differs from the last one
    pub fn update(&mut self, current: bool) -> Option<ActivationEdge> {
        let edge = match (self.previous, current) {
            (false, true) => Some(ActivationEdge::Pressed),
            (true, false) => Some(ActivationEdge::Released),
            _ => None,
        };
        self.previous = current;
        edge
    }
}

/// Fixed-rate loop polling an [`ActivationReader`]
pub struct TickLoop {
    reader: ActivationReader,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl TickLoop {
    /// Create a loop ticking every `interval`
    pub fn new(reader: ActivationReader, interval: Duration) -> Self {
        Self {
            reader,
            interval,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that keeps the loop alive; clearing it stops the loop after the current tick
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run on the calling thread until stopped; returns the number of ticks
    pub fn run<F>(&self, mut on_edge: F) -> u64
    where
        F: FnMut(ActivationEdge),
    {
        let mut detector = EdgeDetector::new();
        let mut ticks: u64 = 0;
        let mut next_tick = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            if let Some(edge) = detector.update(self.reader.get()) {
                debug!("Tick {}: {:?}", ticks, edge);
                on_edge(edge);
            }
            ticks += 1;

            next_tick += self.interval;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            } else {
                // Fell behind; don't try to catch up with a burst of ticks
                next_tick = now;
            }
        }

        ticks
    }

    /// Run on a dedicated thread
    pub fn spawn<F>(self, on_edge: F) -> io::Result<TickLoopHandle>
    where
        F: FnMut(ActivationEdge) + Send + 'static,
    {
        let running = self.running_flag();

        let thread = thread::Builder::new()
            .name("control-loop".to_string())
            .spawn(move || {
                info!("Control loop started ({:?} per tick)", self.interval);
                let ticks = self.run(on_edge);
                info!("Control loop stopped after {} ticks", ticks);
                ticks
            })?;

        Ok(TickLoopHandle { running, thread })
    }
}

/// Handle to a [`TickLoop`] running on its own thread
pub struct TickLoopHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<u64>,
}

impl TickLoopHandle {
    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.thread.is_finished()
    }

    /// Stop the loop and wait for it; returns the number of ticks it ran
    pub fn stop(self) -> u64 {
        self.running.store(false, Ordering::SeqCst);
        match self.thread.join() {
            Ok(ticks) => ticks,
            Err(_) => {
                warn!("Control loop thread panicked");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alpha::signal::ActivationSignal;
    use std::sync::Mutex;

    #[test]
    fn test_edge_detector() {
        let mut detector = EdgeDetector::new();

        assert_eq!(detector.update(false), None);
        assert_eq!(detector.update(true), Some(ActivationEdge::Pressed));
        // Held: no repeat
        assert_eq!(detector.update(true), None);
        assert_eq!(detector.update(false), Some(ActivationEdge::Released));
        assert_eq!(detector.update(false), None);
    }

    #[test]
    fn test_loop_reports_edges_and_stops() {
        let signal = ActivationSignal::new();
        let edges = Arc::new(Mutex::new(Vec::new()));

        let tick_loop = TickLoop::new(signal.reader(), Duration::from_millis(1));
        let recorded = Arc::clone(&edges);
        let handle = tick_loop
            .spawn(move |edge| recorded.lock().unwrap().push(edge))
            .unwrap();

        signal.set(true);
        thread::sleep(Duration::from_millis(50));
        signal.set(false);
        thread::sleep(Duration::from_millis(50));

        assert!(handle.is_running());
        let ticks = handle.stop();
        assert!(ticks > 0);
        assert_eq!(
            *edges.lock().unwrap(),
            vec![ActivationEdge::Pressed, ActivationEdge::Released]
        );
    }
}
