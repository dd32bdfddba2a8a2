//! Job progress reporting.
//!
//! Steps report overall fractions through a [`ProgressSender`]. A per-job
//! [`ProgressDispatcher`] thread forwards them to the single subscriber,
//! dropping anything that would move the bar backwards.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use serde::Serialize;

/// Default minimum advance between two forwarded encoder updates.
pub const DEFAULT_PROGRESS_STEP: f64 = 0.05;

const EPSILON: f64 = 1e-9;

/// One progress update: overall fraction plus a short label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub fraction: f64,
    pub label: String,
}

impl ProgressEvent {
    pub fn new(fraction: f64, label: impl Into<String>) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            label: label.into(),
        }
    }
}

/// Receives a job's progress events on the dispatcher thread.
pub type ProgressSubscriber = Box<dyn FnMut(ProgressEvent) + Send>;

/// Filters raw encoder fractions.
///
/// Values are clamped to `[0, 1]`. A value below the highest one seen is
/// discarded. A value is emitted once it is at least `step` above the last
/// emitted value, or when it first reaches 1.0.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    step: f64,
    highest: f64,
    last_emitted: f64,
}

impl ProgressThrottle {
    pub fn new(step: f64) -> Self {
        Self {
            step: if step.is_finite() && step > 0.0 { step } else { DEFAULT_PROGRESS_STEP },
            highest: 0.0,
            last_emitted: 0.0,
        }
    }

    /// Feed one raw fraction; returns it if it should be forwarded.
    pub fn offer(&mut self, fraction: f64) -> Option<f64> {
        if !fraction.is_finite() {
            return None;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction < self.highest {
            return None;
        }
        self.highest = fraction;

        let reached_end = fraction >= 1.0 && self.last_emitted < 1.0;
        if reached_end || fraction - self.last_emitted >= self.step - EPSILON {
            self.last_emitted = fraction;
            Some(fraction)
        } else {
            None
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_STEP)
    }
}

/// Producer side of a job's progress channel.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Sender<ProgressEvent>,
}

impl ProgressSender {
    /// Send an update. A subscriber that went away is ignored.
    pub fn send(&self, fraction: f64, label: impl Into<String>) {
        let _ = self.tx.send(ProgressEvent::new(fraction, label));
    }
}

/// Thread delivering one job's events to its subscriber.
pub struct ProgressDispatcher {
    handle: JoinHandle<usize>,
}

impl ProgressDispatcher {
    /// Start the dispatcher. It stops once every sender is dropped.
    pub fn spawn(subscriber: ProgressSubscriber) -> (ProgressSender, ProgressDispatcher) {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || dispatch(rx, subscriber));
        (ProgressSender { tx }, ProgressDispatcher { handle })
    }

    /// Wait for the remaining events to be delivered.
    ///
    /// Returns the number of events forwarded. All senders must be dropped
    /// first or this blocks.
    pub fn join(self) -> usize {
        match self.handle.join() {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::warn!("Progress subscriber panicked");
                0
            }
        }
    }
}

fn dispatch(rx: Receiver<ProgressEvent>, mut subscriber: ProgressSubscriber) -> usize {
    let mut last = f64::NEG_INFINITY;
    let mut delivered = 0;
    for event in rx {
        if event.fraction < last {
            continue;
        }
        last = event.fraction;
        subscriber(event);
        delivered += 1;
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn throttle_emits_every_step_and_the_end() {
        let mut throttle = ProgressThrottle::new(0.05);
        let raw = [0.0, 0.01, 0.04, 0.05, 0.07, 0.11, 0.12, 0.5, 0.52, 0.98, 1.3];
        let emitted: Vec<f64> = raw.iter().filter_map(|f| throttle.offer(*f)).collect();
        assert_eq!(emitted, vec![0.05, 0.11, 0.5, 0.98, 1.0]);
    }

    #[test]
    fn throttle_discards_regressions() {
        let mut throttle = ProgressThrottle::new(0.05);
        assert_eq!(throttle.offer(0.3), Some(0.3));
        assert_eq!(throttle.offer(0.1), None);
        assert_eq!(throttle.offer(0.34), None);
        assert_eq!(throttle.offer(0.35), Some(0.35));
        assert_eq!(throttle.offer(f64::NAN), None);
        assert_eq!(throttle.offer(1.0), Some(1.0));
        assert_eq!(throttle.offer(1.0), None);
    }

    #[test]
    fn throttled_output_is_non_decreasing() {
        let mut throttle = ProgressThrottle::default();
        let raw: Vec<f64> = (0..200)
            .map(|i| ((i * 37) % 101) as f64 / 100.0)
            .collect();
        let emitted: Vec<f64> = raw.iter().filter_map(|f| throttle.offer(*f)).collect();
        assert!(emitted.windows(2).all(|w| w[1] - w[0] >= 0.05 - 1e-9 || w[1] == 1.0));
    }

    #[test]
    fn dispatcher_delivers_in_order_without_regressions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let (sender, dispatcher) = ProgressDispatcher::spawn(Box::new(move |event| {
            sink.lock().unwrap().push(event.fraction);
        }));

        sender.send(0.1, "Probing");
        sender.send(0.3, "Encoding");
        sender.send(0.2, "stale");
        sender.clone().send(1.0, "Done");
        drop(sender);

        assert_eq!(dispatcher.join(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![0.1, 0.3, 1.0]);
    }

    #[test]
    fn events_are_clamped() {
        assert_eq!(ProgressEvent::new(1.7, "x").fraction, 1.0);
        assert_eq!(ProgressEvent::new(-0.2, "x").fraction, 0.0);
    }
}
