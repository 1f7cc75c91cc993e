//! The seven-priority FIFO send queue (spec.md §4.3).
//!
//! Grounded on the teacher's abandoned synchronous `serial.rs` prototype for
//! its thread-and-channel idiom, generalized from that prototype's single
//! channel to the seven ordered priorities spec.md requires, and on the
//! `crossbeam_channel`-free approach of plain `std::sync::{Mutex, Condvar}`
//! since this workspace doesn't carry `crossbeam_channel` as a dependency.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;
use zwave_core::ids::NodeId;
use zwave_serial::command::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueuePriority {
    Command,
    NoOp,
    Controller,
    WakeUp,
    Send,
    Query,
    Poll,
}

pub const ALL_PRIORITIES: [QueuePriority; 7] = [
    QueuePriority::Command,
    QueuePriority::NoOp,
    QueuePriority::Controller,
    QueuePriority::WakeUp,
    QueuePriority::Send,
    QueuePriority::Query,
    QueuePriority::Poll,
];

#[derive(Debug, Clone)]
pub struct QueueItem {
    pub message: Message,
    pub priority: QueuePriority,
    pub target_node: Option<NodeId>,
}

impl QueueItem {
    pub fn new(message: Message, priority: QueuePriority) -> Self {
        let target_node = message.node_id;
        Self { message, priority, target_node }
    }
}

#[derive(Default)]
struct Queues {
    command: VecDeque<QueueItem>,
    noop: VecDeque<QueueItem>,
    controller: VecDeque<QueueItem>,
    wake_up: VecDeque<QueueItem>,
    send: VecDeque<QueueItem>,
    query: VecDeque<QueueItem>,
    poll: VecDeque<QueueItem>,
}

impl Queues {
    fn queue_mut(&mut self, priority: QueuePriority) -> &mut VecDeque<QueueItem> {
        match priority {
            QueuePriority::Command => &mut self.command,
            QueuePriority::NoOp => &mut self.noop,
            QueuePriority::Controller => &mut self.controller,
            QueuePriority::WakeUp => &mut self.wake_up,
            QueuePriority::Send => &mut self.send,
            QueuePriority::Query => &mut self.query,
            QueuePriority::Poll => &mut self.poll,
        }
    }

    /// Pops from the highest-priority non-empty queue up to and including
    /// `max_priority` (inclusive of that queue).
    fn pop_up_to(&mut self, max_priority: QueuePriority) -> Option<QueueItem> {
        for priority in ALL_PRIORITIES {
            let item = self.queue_mut(priority).pop_front();
            if item.is_some() {
                return item;
            }
            if priority == max_priority {
                break;
            }
        }
        None
    }

    fn is_empty_up_to(&mut self, max_priority: QueuePriority) -> bool {
        for priority in ALL_PRIORITIES {
            if !self.queue_mut(priority).is_empty() {
                return false;
            }
            if priority == max_priority {
                break;
            }
        }
        true
    }
}

/// The driver's send-side scheduler: seven FIFO queues drained highest
/// priority first, with a condvar so callers can block for work.
pub struct SendQueue {
    queues: Mutex<Queues>,
    signal: Condvar,
}

impl Default for SendQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SendQueue {
    pub fn new() -> Self {
        Self { queues: Mutex::new(Queues::default()), signal: Condvar::new() }
    }

    pub fn push(&self, item: QueueItem) {
        let mut queues = self.queues.lock().unwrap();
        queues.queue_mut(item.priority).push_back(item);
        self.signal.notify_all();
    }

    /// Pops the next item considering only queues up to `max_priority`
    /// (spec.md §4.3's gating: fewer queues armed while a message is in
    /// flight, a controller command is active, or the manufacturer DB is
    /// still initializing).
    pub fn pop(&self, max_priority: QueuePriority) -> Option<QueueItem> {
        let mut queues = self.queues.lock().unwrap();
        queues.pop_up_to(max_priority)
    }

    /// Blocks up to `timeout` for an item to become available among queues
    /// up to `max_priority`, then pops it.
    pub fn wait_pop(&self, max_priority: QueuePriority, timeout: Duration) -> Option<QueueItem> {
        let queues = self.queues.lock().unwrap();
        let (mut queues, _) = self
            .signal
            .wait_timeout_while(queues, timeout, |q| q.is_empty_up_to(max_priority))
            .unwrap();
        queues.pop_up_to(max_priority)
    }

    pub fn len(&self, priority: QueuePriority) -> usize {
        self.queues.lock().unwrap().queue_mut(priority).len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.lock().unwrap().is_empty_up_to(QueuePriority::Poll)
    }

    /// Removes all pending items targeting `node_id` from the Send/Query
    /// queues, returning them in FIFO order (used by wake-up deferral,
    /// spec.md §4.6).
    pub fn drain_for_node(&self, node_id: NodeId) -> Vec<QueueItem> {
        let mut queues = self.queues.lock().unwrap();
        let mut drained = Vec::new();
        for priority in [QueuePriority::Send, QueuePriority::Query] {
            let q = queues.queue_mut(priority);
            let mut remaining = VecDeque::with_capacity(q.len());
            for item in q.drain(..) {
                if item.target_node == Some(node_id) {
                    drained.push(item);
                } else {
                    remaining.push_back(item);
                }
            }
            *q = remaining;
        }
        drained
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use zwave_serial::command::Message;
    use zwave_serial::function_type::FunctionType;

    fn msg() -> Message {
        Message::new(FunctionType::GetVersion, vec![])
    }

    #[test]
    fn higher_priority_queue_drains_first() {
        let q = SendQueue::new();
        q.push(QueueItem::new(msg(), QueuePriority::Poll));
        q.push(QueueItem::new(msg(), QueuePriority::Command));
        q.push(QueueItem::new(msg(), QueuePriority::Send));

        let first = q.pop(QueuePriority::Poll).unwrap();
        assert_eq!(first.priority, QueuePriority::Command);
        let second = q.pop(QueuePriority::Poll).unwrap();
        assert_eq!(second.priority, QueuePriority::Send);
        let third = q.pop(QueuePriority::Poll).unwrap();
        assert_eq!(third.priority, QueuePriority::Poll);
        assert!(q.pop(QueuePriority::Poll).is_none());
    }

    #[test]
    fn fifo_within_a_single_priority() {
        let q = SendQueue::new();
        for target in [1u8, 2, 3] {
            q.push(QueueItem::new(msg().for_node(NodeId::from(target)), QueuePriority::Send));
        }
        let order: Vec<u8> = (0..3)
            .map(|_| u8::from(q.pop(QueuePriority::Poll).unwrap().target_node.unwrap()))
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn max_priority_gate_hides_lower_queues() {
        let q = SendQueue::new();
        q.push(QueueItem::new(msg(), QueuePriority::Poll));
        assert!(q.pop(QueuePriority::Controller).is_none());
        assert!(q.pop(QueuePriority::Poll).is_some());
    }

    #[test]
    fn drain_for_node_pulls_send_and_query_items_in_order() {
        let q = SendQueue::new();
        let target = NodeId::from(7u8);
        q.push(QueueItem::new(msg().for_node(target), QueuePriority::Send));
        q.push(QueueItem::new(msg().for_node(NodeId::from(2u8)), QueuePriority::Send));
        q.push(QueueItem::new(msg().for_node(target), QueuePriority::Query));

        let drained = q.drain_for_node(target);
        assert_eq!(drained.len(), 2);
        assert_eq!(q.len(QueuePriority::Send), 1);
    }
}
