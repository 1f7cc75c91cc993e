//! The Timer thread (SPEC_FULL.md §4 supplement, grounded on
//! original_source's `TimerThread.cpp`/`.h`): a generic
//! `TimerSetEvent(delay, callback)` facility used for wake-up-interval
//! deadlines and manufacturer-DB revision re-checks, rather than
//! special-casing each deadline inline.
//!
//! Grounded on the teacher's abandoned synchronous `serial.rs` prototype for
//! the dedicated-OS-thread-plus-condvar idiom (the teacher's real driver has
//! no timer concept of its own — it schedules deadlines on the async
//! runtime's own timer wheel, which this crate has no equivalent of).

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct Entry {
    deadline: Instant,
    id: TimerId,
    callback: Box<dyn FnOnce() + Send>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline.cmp(&other.deadline)
    }
}

#[derive(Default)]
struct Shared {
    heap: Mutex<BinaryHeap<Reverse<Entry>>>,
    cancelled: Mutex<std::collections::HashSet<u64>>,
    signal: Condvar,
    next_id: AtomicU64,
}

/// One pending-event list plus one condvar, owned by a dedicated OS thread
/// (spec.md §5's "Timer thread"). Dropping the handle joins the thread.
pub struct TimerThread {
    shared: Arc<Shared>,
    exit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Default for TimerThread {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerThread {
    pub fn new() -> Self {
        let shared = Arc::new(Shared::default());
        let exit = Arc::new(AtomicBool::new(false));
        let thread_shared = shared.clone();
        let thread_exit = exit.clone();
        let handle = std::thread::spawn(move || run(thread_shared, thread_exit));
        Self { shared, exit, handle: Some(handle) }
    }

    /// Schedules `callback` to run after `delay`, returning an id that can
    /// cancel it before it fires.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TimerId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Entry { deadline: Instant::now() + delay, id, callback: Box::new(callback) };
        self.shared.heap.lock().unwrap().push(Reverse(entry));
        self.shared.signal.notify_all();
        id
    }

    /// Prevents a not-yet-fired timer from running. A timer already popped
    /// off the heap and mid-callback cannot be cancelled.
    pub fn cancel(&self, id: TimerId) {
        self.shared.cancelled.lock().unwrap().insert(id.0);
    }

    pub fn pending_count(&self) -> usize {
        self.shared.heap.lock().unwrap().len()
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        self.exit.store(true, Ordering::SeqCst);
        self.shared.signal.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(shared: Arc<Shared>, exit: Arc<AtomicBool>) {
    loop {
        if exit.load(Ordering::SeqCst) {
            return;
        }
        let mut heap = shared.heap.lock().unwrap();
        let due = match heap.peek() {
            None => {
                let (guard, _) = shared.signal.wait_timeout(heap, Duration::from_millis(200)).unwrap();
                heap = guard;
                None
            }
            Some(Reverse(entry)) => {
                let now = Instant::now();
                if entry.deadline <= now {
                    heap.pop().map(|Reverse(e)| e)
                } else {
                    let wait = entry.deadline - now;
                    let (guard, _) = shared.signal.wait_timeout(heap, wait).unwrap();
                    heap = guard;
                    None
                }
            }
        };
        drop(heap);

        if let Some(entry) = due {
            let cancelled = shared.cancelled.lock().unwrap().remove(&entry.id.0);
            if !cancelled {
                (entry.callback)();
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn fires_after_the_requested_delay() {
        let timer = TimerThread::new();
        let (tx, rx) = mpsc::channel();
        timer.schedule(Duration::from_millis(10), move || {
            tx.send(()).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(2)).expect("timer did not fire");
    }

    #[test]
    fn earlier_timer_fires_before_a_later_one_scheduled_first() {
        let timer = TimerThread::new();
        let (tx, rx) = mpsc::channel();
        let tx_a = tx.clone();
        let tx_b = tx.clone();
        timer.schedule(Duration::from_millis(50), move || tx_a.send("slow").unwrap());
        timer.schedule(Duration::from_millis(5), move || tx_b.send("fast").unwrap());

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, "fast");
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(second, "slow");
    }

    #[test]
    fn a_cancelled_timer_never_runs() {
        let timer = TimerThread::new();
        let (tx, rx) = mpsc::channel::<()>();
        let id = timer.schedule(Duration::from_millis(20), move || {
            tx.send(()).unwrap();
        });
        timer.cancel(id);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
