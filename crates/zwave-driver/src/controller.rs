//! Controller commands (spec.md §4.7): scripted multi-frame exchanges
//! (inclusion, exclusion, neighbor updates, return routes, …) surfaced to
//! the application as `ControllerCommand` notifications.
//!
//! Grounded on the teacher's `zwave-driver::controller_commands` state
//! machine (the kind enum and state transitions), reworked from its async
//! per-command future into the plain struct this crate's blocking driver
//! thread advances directly. The engine holds at most one command active
//! at a time; anything else queued behind it waits (spec.md's
//! `currentControllerCommand`).

use zwave_core::ids::NodeId;
use zwave_core::protocol_info::NodeProtocolInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCommandKind {
    AddDevice,
    RemoveDevice,
    CreateNewPrimary,
    ReceiveConfiguration,
    RemoveFailedNode,
    ReplaceFailedNode,
    HasNodeFailed,
    RequestNodeNeighborUpdate,
    AssignReturnRoute,
    DeleteReturnRoute,
    RequestNetworkUpdate,
    ReplicationSend,
    CreateButton,
    DeleteButton,
    SetLearnMode,
    RequestNodeInfo,
}

impl ControllerCommandKind {
    /// Matches spec.md §4.7's "commands that don't support cancel" list.
    pub fn supports_cancel(self) -> bool {
        !matches!(
            self,
            ControllerCommandKind::RequestNetworkUpdate
                | ControllerCommandKind::AssignReturnRoute
                | ControllerCommandKind::DeleteReturnRoute
                | ControllerCommandKind::HasNodeFailed
                | ControllerCommandKind::RequestNodeInfo
        )
    }

    /// The command-specific "stop" frame function id sent on cancel, where
    /// one exists.
    pub fn stop_function(self) -> Option<u8> {
        match self {
            ControllerCommandKind::AddDevice => Some(0x4a),       // AddNodeToNetwork(Stop)
            ControllerCommandKind::RemoveDevice => Some(0x4b),    // RemoveNodeFromNetwork(Stop)
            ControllerCommandKind::CreateNewPrimary => Some(0x4c), // CreateNewPrimary(Stop)
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCommandState {
    Normal,
    Waiting,
    InProgress,
    Completed,
    Failed,
    Error,
    Cancel,
    NodeOk,
    NodeFailed,
    Sleeping,
}

#[derive(Debug, Clone)]
pub struct ControllerCommand {
    pub kind: ControllerCommandKind,
    pub state: ControllerCommandState,
    pub target_node: Option<NodeId>,
    pub argument: i32,
    pub done: bool,
    /// Accumulates the protocol-info blob seen on
    /// ADD_NODE_STATUS_ADDING_SLAVE/CONTROLLER so the add-device path can
    /// feed it directly to node init without a redundant ProtocolInfo
    /// round trip.
    pub collected_protocol_info: Option<NodeProtocolInfo>,
}

impl ControllerCommand {
    pub fn new(kind: ControllerCommandKind, target_node: Option<NodeId>, argument: i32) -> Self {
        Self {
            kind,
            state: ControllerCommandState::Normal,
            target_node,
            argument,
            done: false,
            collected_protocol_info: None,
        }
    }

    pub fn start(&mut self) {
        self.state = ControllerCommandState::Waiting;
    }

    pub fn advance(&mut self, state: ControllerCommandState) {
        self.state = state;
        self.done = matches!(
            state,
            ControllerCommandState::Completed
                | ControllerCommandState::Failed
                | ControllerCommandState::Error
                | ControllerCommandState::Cancel
                | ControllerCommandState::NodeOk
                | ControllerCommandState::NodeFailed
        );
    }

    /// Records the protocol-info blob an ADD_NODE_STATUS_ADDING_SLAVE (or
    /// _CONTROLLER) frame carried, so InitNode can use it directly.
    pub fn collect_protocol_info(&mut self, info: NodeProtocolInfo) {
        self.collected_protocol_info = Some(info);
    }

    /// spec.md §4.6 trigger 3: a controller command targeting a sleeping
    /// node is parked rather than failed outright.
    pub fn defer_for_sleep(&mut self) {
        self.state = ControllerCommandState::Sleeping;
    }

    pub fn cancel(&mut self) -> Result<(), CancelNotSupported> {
        if !self.kind.supports_cancel() {
            return Err(CancelNotSupported);
        }
        self.advance(ControllerCommandState::Cancel);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelNotSupported;

/// Single-active-command queue (spec.md's `currentControllerCommand`):
/// nested requests wait until the active one finishes.
#[derive(Default)]
pub struct ControllerCommandQueue {
    active: Option<ControllerCommand>,
    pending: std::collections::VecDeque<ControllerCommand>,
}

impl ControllerCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submits a command; starts it immediately if none is active, else
    /// queues it behind the active one.
    pub fn submit(&mut self, mut command: ControllerCommand) {
        if self.active.is_none() {
            command.start();
            self.active = Some(command);
        } else {
            self.pending.push_back(command);
        }
    }

    pub fn active(&self) -> Option<&ControllerCommand> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ControllerCommand> {
        self.active.as_mut()
    }

    /// If the active command is done, retires it and promotes the next
    /// pending one (if any), returning the retired command.
    pub fn retire_if_done(&mut self) -> Option<ControllerCommand> {
        if self.active.as_ref().is_some_and(|c| c.done) {
            let retired = self.active.take();
            if let Some(mut next) = self.pending.pop_front() {
                next.start();
                self.active = Some(next);
            }
            retired
        } else {
            None
        }
    }
}
