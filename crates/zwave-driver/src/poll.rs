//! The poll loop (spec.md §4.9): a cooperative round-robin over registered
//! values, re-requesting each at its configured intensity without starving
//! normal send traffic.
//!
//! Grounded on the teacher's abandoned synchronous `serial.rs` prototype
//! for the thread/condvar idiom, generalized to the ring-buffer-of-entries
//! model spec.md describes (pop head, requeue at tail) since the teacher's
//! actual async driver has no polling concept of its own to borrow from.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use zwave_core::ids::NodeId;
use zwave_core::value::ValueId;

/// How many poll cycles to skip between refreshes of a given value — 1
/// means "poll every cycle".
#[derive(Debug, Clone)]
pub struct PollEntry {
    pub value_id: ValueId,
    pub intensity: u32,
    counter: u32,
}

impl PollEntry {
    pub fn new(value_id: ValueId, intensity: u32) -> Self {
        let intensity = intensity.max(1);
        Self { value_id, intensity, counter: intensity }
    }
}

#[derive(Default)]
pub struct PollList {
    entries: Mutex<VecDeque<PollEntry>>,
}

pub enum PollStep {
    /// Nothing to poll this cycle, or the list is empty.
    Idle,
    /// This value is due: enqueue a refresh for it.
    Due(ValueId),
    /// This value's counter just got decremented; not due yet.
    Skipped,
}

impl PollList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, value_id: ValueId, intensity: u32) {
        self.entries.lock().unwrap().push_back(PollEntry::new(value_id, intensity));
    }

    pub fn remove(&self, value_id: ValueId) {
        self.entries.lock().unwrap().retain(|e| e.value_id != value_id);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Implements steps 2-3 of spec.md §4.9: pop the head entry; if its
    /// counter is still above 1, decrement and requeue without polling;
    /// otherwise reset its counter to its intensity, requeue, and report it
    /// due for a refresh.
    pub fn step(&self) -> PollStep {
        let mut entries = self.entries.lock().unwrap();
        let Some(mut entry) = entries.pop_front() else {
            return PollStep::Idle;
        };
        if entry.counter > 1 {
            entry.counter -= 1;
            let value_id = entry.value_id;
            entries.push_back(entry);
            let _ = value_id;
            PollStep::Skipped
        } else {
            entry.counter = entry.intensity;
            let value_id = entry.value_id;
            entries.push_back(entry);
            PollStep::Due(value_id)
        }
    }

    /// The per-cycle sleep interval when per-poll spacing is disabled:
    /// the configured interval divided evenly across the list.
    pub fn interval_for_cycle(&self, configured_interval: Duration, per_poll_spacing: bool) -> Duration {
        if per_poll_spacing {
            return configured_interval;
        }
        let len = self.len().max(1) as u32;
        configured_interval / len
    }
}

pub const STARVATION_WARNING_THRESHOLD: Duration = Duration::from_secs(300);
const STARVATION_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Spin-waits (in `STARVATION_POLL_INTERVAL` increments) until
/// `queues_empty` reports true, returning once it does. Calls
/// `on_starvation_warning` the first time the wait crosses
/// `STARVATION_WARNING_THRESHOLD`, so the caller can log once per episode
/// rather than every increment.
pub fn wait_for_higher_priority_queues(
    mut queues_empty: impl FnMut() -> bool,
    mut sleep: impl FnMut(Duration),
    mut on_starvation_warning: impl FnMut(),
    started_at: Instant,
    now: impl Fn() -> Instant,
) {
    let mut warned = false;
    while !queues_empty() {
        if !warned && now().duration_since(started_at) >= STARVATION_WARNING_THRESHOLD {
            warned = true;
            on_starvation_warning();
        }
        sleep(STARVATION_POLL_INTERVAL);
    }
}

pub const IDLE_WAIT: Duration = Duration::from_millis(500);

/// Whether the poll loop should sit out this cycle entirely (spec.md §4.9
/// step 1).
pub fn should_idle(awake_nodes_queried: bool, list_empty: bool) -> bool {
    !awake_nodes_queried || list_empty
}

/// Marks that `node_id`'s wake-up CC should request a refresh for
/// `value_id` the next time it wakes, since it's asleep right now.
pub struct DeferredPoll {
    pub node_id: NodeId,
    pub value_id: ValueId,
}
