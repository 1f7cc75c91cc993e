//! The `Node` struct (spec.md §3): everything the driver tracks for a single
//! network member, owned exclusively by its `Driver`.
//!
//! Grounded on the teacher's `zwave-driver::node::Node` for the field split
//! (protocol info, per-CC handler map, value store, alive/dead tracking),
//! generalized to this crate's synchronous `Interview` state machine and
//! the supplemented per-node statistics counters (`original_source`'s
//! `Driver.cpp` `NodeData`).

use std::collections::HashMap;

use bitvec::prelude::{BitArray, Msb0};
use zwave_core::command_classes::CommandClasses;
use zwave_core::ids::NodeId;
use zwave_core::protocol_info::NodeProtocolInfo;
use zwave_core::stats::NodeStatistics;
use zwave_core::value::Value;
use zwave_cc::envelope::CommandClassHandler;

use crate::interview::Interview;

/// 232 bits (29 bytes), one per possible node id, reported by
/// GetRoutingInfo during the Neighbors interview stage.
pub type NeighborMap = BitArray<[u8; 29], Msb0>;

/// A single `(command class, instance, index)` value within a node,
/// addressed the way `zwave_core::value::ValueId` does but without the
/// redundant home/node id fields a per-node map doesn't need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueKey {
    pub command_class: CommandClasses,
    pub instance: u8,
    pub index: u8,
}

pub struct Node {
    pub id: NodeId,
    pub protocol_info: NodeProtocolInfo,
    pub command_classes: HashMap<CommandClasses, Box<dyn CommandClassHandler>>,
    pub values: HashMap<ValueKey, Value>,
    pub neighbors: NeighborMap,
    pub interview: Interview,
    alive: bool,
    pub statistics: NodeStatistics,
}

impl Node {
    pub fn new(id: NodeId, protocol_info: NodeProtocolInfo) -> Self {
        Self {
            id,
            protocol_info,
            command_classes: HashMap::new(),
            values: HashMap::new(),
            neighbors: NeighborMap::ZERO,
            interview: Interview::default(),
            alive: true,
            statistics: NodeStatistics::default(),
        }
    }

    /// Loaded from the persisted cache (spec.md §4.8): skips straight to the
    /// CacheLoad interview stage instead of starting from scratch.
    pub fn from_cache(id: NodeId, protocol_info: NodeProtocolInfo) -> Self {
        let mut node = Self::new(id, protocol_info);
        node.interview.resume_from_cache();
        node
    }

    pub fn is_sleeping(&self) -> bool {
        self.protocol_info.is_sleeping()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn add_command_class(&mut self, handler: Box<dyn CommandClassHandler>) {
        self.command_classes.insert(handler.cc_id(), handler);
    }

    pub fn has_command_class(&self, cc: CommandClasses) -> bool {
        self.command_classes.contains_key(&cc)
    }

    pub fn set_value(&mut self, key: ValueKey, value: Value) {
        self.values.insert(key, value);
    }

    pub fn get_value(&self, key: ValueKey) -> Option<&Value> {
        self.values.get(&key)
    }

    /// A successful send or an unsolicited frame from this node revives it
    /// (spec.md §7 node error handling).
    pub fn record_success(&mut self) {
        self.statistics.record_success();
        self.alive = true;
    }

    /// Three consecutive transmission errors flip the node to not-alive.
    /// Returns whether this call caused the flip.
    pub fn record_transmission_error(&mut self) -> bool {
        let became_dead = self.statistics.record_transmission_error();
        if became_dead && self.alive {
            self.alive = false;
            self.interview.mark_dead();
            return true;
        }
        false
    }
}
