//! Sleeping-node deferred-delivery queue (spec.md §4.6).
//!
//! Grounded on the teacher's `abandoned sync serial.rs` thread/queue idiom
//! applied to per-node FIFOs, and on `zwave-cc::wake_up` for the
//! `NoMoreInformation` envelope appended on flush.

use std::collections::{HashMap, VecDeque};
use zwave_core::ids::NodeId;

use crate::queue::QueueItem;

/// Per-node FIFO of messages held back while the node sleeps.
#[derive(Default)]
pub struct WakeUpQueues {
    by_node: HashMap<NodeId, VecDeque<QueueItem>>,
}

impl WakeUpQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// SendMsg called for a sleeping target (spec.md §4.6 trigger 1), or a
    /// transaction moved here after exhausting its attempts (trigger 2).
    pub fn defer(&mut self, node_id: NodeId, item: QueueItem) {
        self.by_node.entry(node_id).or_default().push_back(item);
    }

    pub fn defer_many(&mut self, node_id: NodeId, items: impl IntoIterator<Item = QueueItem>) {
        let queue = self.by_node.entry(node_id).or_default();
        queue.extend(items);
    }

    pub fn pending_count(&self, node_id: NodeId) -> usize {
        self.by_node.get(&node_id).map_or(0, VecDeque::len)
    }

    /// Flushes `node_id`'s pending queue in FIFO order, appending exactly
    /// one WakeUpNoMoreInformation item so the node may return to sleep.
    /// WakeUpNoMoreInformation is never itself deferred.
    pub fn flush(&mut self, node_id: NodeId, no_more_information: QueueItem) -> Vec<QueueItem> {
        let mut flushed: Vec<QueueItem> =
            self.by_node.remove(&node_id).map(|q| q.into_iter().collect()).unwrap_or_default();
        flushed.push(no_more_information);
        flushed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::queue::QueuePriority;
    use zwave_serial::command::Message;
    use zwave_serial::function_type::FunctionType;

    fn item(node: u8) -> QueueItem {
        QueueItem::new(
            Message::new(FunctionType::SendData, vec![]).for_node(NodeId::from(node)),
            QueuePriority::WakeUp,
        )
    }

    fn nmi_item() -> QueueItem {
        let msg = Message::new(FunctionType::SendData, zwave_cc::wake_up::no_more_information().encode());
        QueueItem::new(msg, QueuePriority::WakeUp)
    }

    #[test]
    fn flush_preserves_enqueue_order_and_appends_no_more_information() {
        let mut queues = WakeUpQueues::new();
        let node = NodeId::from(7u8);
        queues.defer(node, item(7));
        queues.defer(node, item(7));

        let flushed = queues.flush(node, nmi_item());
        assert_eq!(flushed.len(), 3);
        assert_eq!(queues.pending_count(node), 0);
    }

    #[test]
    fn flushing_an_empty_queue_still_yields_no_more_information() {
        let mut queues = WakeUpQueues::new();
        let node = NodeId::from(3u8);
        let flushed = queues.flush(node, nmi_item());
        assert_eq!(flushed.len(), 1);
    }
}
