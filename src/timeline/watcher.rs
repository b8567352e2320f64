// Position watcher
// A polling loop that detects playhead motion regardless of which writer
// caused it and fans the new value out to subscribers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;

use crate::timeline::cursor::PlayheadCursor;

type PositionCallback = Box<dyn Fn(f64) + Send + 'static>;

/// Observes a `PlayheadCursor` on a fixed interval and notifies
/// subscribers whenever the value differs from the last one this watcher
/// saw.
///
/// Detection is edge-triggered on value change, not on write count: two
/// writes landing on the same value between polls are observed as a
/// single change. After the stop flag is raised the loop performs one
/// final comparison, so the last value before polling ends is always
/// delivered.
pub struct PositionWatcher {
    subscribers: Arc<Mutex<Vec<PositionCallback>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PositionWatcher {
    /// Start the polling thread. Subscribers may be registered before or
    /// after spawning.
    pub fn spawn(cursor: Arc<PlayheadCursor>, poll_interval: Duration) -> Self {
        let subscribers: Arc<Mutex<Vec<PositionCallback>>> = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let subs = Arc::clone(&subscribers);
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || {
            let mut last_seen = cursor.get();
            while flag.load(Ordering::Acquire) {
                last_seen = poll_once(&cursor, last_seen, &subs);
                thread::sleep(poll_interval);
            }
            // deliver whatever value is current when polling stops
            poll_once(&cursor, last_seen, &subs);
            debug!("position watcher exited");
        });

        Self {
            subscribers,
            running,
            handle: Some(handle),
        }
    }

    /// Register a callback invoked with the new position on every
    /// observed change
    pub fn subscribe(&self, callback: impl Fn(f64) + Send + 'static) {
        self.subscribers.lock().push(Box::new(callback));
    }

    /// Stop the polling thread and wait for it to finish. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PositionWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_once(
    cursor: &PlayheadCursor,
    last_seen: f64,
    subscribers: &Mutex<Vec<PositionCallback>>,
) -> f64 {
    let current = cursor.get();
    if current != last_seen {
        for callback in subscribers.lock().iter() {
            callback(current);
        }
    }
    current
}
