//! The notification bus (spec.md §4.10): in-order delivery of state-change
//! events to registered watchers.
//!
//! Grounded on the teacher's `zwave-driver::events` broadcast channel,
//! reworked from its async `tokio::sync::broadcast` into the plain
//! callback-registry this crate's blocking driver thread drains directly —
//! the watcher list stays under one mutex per spec.md's "notification
//! mutex" resource row, released between individual callback invocations so
//! a watcher may register or remove itself mid-delivery without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub use zwave_core::notification::{Notification, UserAlert};

type WatcherCallback = dyn Fn(&Notification) + Send + Sync;

struct Watcher {
    id: u64,
    callback: Arc<WatcherCallback>,
    removed: bool,
}

/// Registration handle returned by `NotificationBus::register`; pass it to
/// `unregister` to stop receiving further notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherId(u64);

#[derive(Default)]
pub struct NotificationBus {
    watchers: Mutex<Vec<Watcher>>,
    next_id: AtomicU64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, callback: F) -> WatcherId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.watchers.lock().unwrap().push(Watcher { id, callback: Arc::new(callback), removed: false });
        WatcherId(id)
    }

    pub fn unregister(&self, id: WatcherId) {
        let mut watchers = self.watchers.lock().unwrap();
        if let Some(w) = watchers.iter_mut().find(|w| w.id == id.0) {
            w.removed = true;
        }
    }

    /// Delivers `notification` to every watcher registered at the time each
    /// slot is reached. The lock is dropped before invoking a callback, so a
    /// callback may safely call `register`/`unregister` (including removing
    /// itself) without deadlocking this call.
    pub fn notify(&self, notification: &Notification) {
        let mut index = 0;
        loop {
            let callback = {
                let watchers = self.watchers.lock().unwrap();
                let Some(w) = watchers.get(index) else { break };
                if w.removed { index += 1; continue } else { w.callback.clone() }
            };
            callback(notification);
            index += 1;
        }
    }

    /// Drops watchers that unregistered themselves, so the list doesn't
    /// grow unbounded across a long-lived driver session.
    pub fn compact(&self) {
        self.watchers.lock().unwrap().retain(|w| !w.removed);
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().unwrap().iter().filter(|w| !w.removed).count()
    }
}

pub use zwave_core::stats::DriverStatistics;

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn delivers_to_every_registered_watcher_exactly_once() {
        let bus = NotificationBus::new();
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));
        let a = count_a.clone();
        let b = count_b.clone();
        bus.register(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        bus.register(move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        });

        bus.notify(&Notification::DriverReady);
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn a_watcher_may_remove_itself_mid_delivery_without_deadlocking() {
        let bus = Arc::new(NotificationBus::new());
        let inner = bus.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let id_cell: Arc<Mutex<Option<WatcherId>>> = Arc::new(Mutex::new(None));
        let id_cell_clone = id_cell.clone();

        let id = bus.register(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_cell_clone.lock().unwrap() {
                inner.unregister(id);
            }
        });
        *id_cell.lock().unwrap() = Some(id);

        bus.notify(&Notification::DriverReady);
        bus.notify(&Notification::DriverReady);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistering_stops_further_delivery() {
        let bus = NotificationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = bus.register(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.notify(&Notification::DriverReady);
        bus.unregister(id);
        bus.notify(&Notification::DriverReady);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        bus.compact();
        assert_eq!(bus.watcher_count(), 0);
    }
}
