//! Serial API function identifiers.
//!
//! spec.md §6 names the subset of the full Sigma Designs Serial API this
//! core consumes; that subset is reproduced bit-exact here. Grounded on the
//! teacher's (much larger) `zwave-core::definitions::function_type`.

use derive_try_from_primitive::TryFromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum FunctionType {
    SerialApiGetInitData = 0x02,
    ApplicationCommandHandler = 0x04,
    GetControllerCapabilities = 0x05,
    SerialApiGetCapabilities = 0x07,
    SoftReset = 0x08,
    SendData = 0x13,
    GetVersion = 0x15,
    RequestNodeNeighborUpdate = 0x48,
    RequestNetworkUpdate = 0x53,
    GetRandom = 0x1c,
    MemoryGetId = 0x20,
    GetNodeProtocolInfo = 0x41,
    AssignReturnRoute = 0x46,
    DeleteReturnRoute = 0x47,
    ApplicationUpdate = 0x49,
    AddNodeToNetwork = 0x4a,
    RemoveNodeFromNetwork = 0x4b,
    CreateNewPrimary = 0x4c,
    ControllerChange = 0x4d,
    SetLearnMode = 0x50,
    EnableSuc = 0x52,
    // 0x54 and 0x55 are overloaded in the real Serial API (SendSlaveNodeInfo,
    // SetSlaveLearnMode, SetSucNodeId, GetVirtualNodes all share func ids
    // depending on controller role); only the two this driver issues are
    // represented.
    SetSucNodeId = 0x54,
    GetVirtualNodes = 0x55,
    GetSucNodeId = 0x56,
    SendNodeInformation = 0x12,
    GetRoutingInfo = 0x80,
    SetDefault = 0x42,
    RemoveFailedNodeId = 0x61,
    IsFailedNodeId = 0x62,
    ReplaceFailedNode = 0x63,
    SerialApiSetup = 0x0b,
}
