//! The notification bus's event type.
//!
//! Spec.md §3 calls for "~30 variants"; original_source's
//! `NotificationCCTypes.h`/`.cpp` name the fuller OpenZWave catalog this is
//! adapted from.

use crate::ids::NodeId;
use crate::value::ValueId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAlert {
    None,
    MissingRouteConfig,
    UnsupportedController,
    ApplicationStatusRetry,
    ApplicationStatusQueued,
    ApplicationStatusRejected,
    ConfigOutOfDate,
    DNSError,
    NodeNameTooLong,
    CannotRoute,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DriverReady,
    DriverFailed,
    DriverReset,
    DriverRemoved,

    /// A send exhausted its retry attempts without completing (spec.md §4.4).
    Timeout(NodeId),

    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    NodeReset(NodeId),
    NodeQueriesComplete(NodeId),
    NodeProtocolInfo(NodeId),
    NodeNaming(NodeId),
    NodeEvent(NodeId, u8),
    EssentialNodeQueriesComplete(NodeId),

    AllNodesQueried,
    AllNodesQueriedSomeDead,
    AwakeNodesQueried,

    ValueAdded(ValueId),
    ValueChanged(ValueId),
    ValueRefreshed(ValueId),
    ValueRemoved(ValueId),

    Group(NodeId),
    SceneEvent(NodeId, u8),

    PollingEnabled(ValueId),
    PollingDisabled(ValueId),

    CreateButton(u8),
    DeleteButton(u8),
    ButtonOn(u8),
    ButtonOff(u8),

    ControllerCommand {
        state: &'static str,
        error: Option<&'static str>,
    },

    Notification(&'static str),
    UserAlert(UserAlert),

    ManufacturerSpecificDbReady,
}
