//! A node's protocol-level capabilities as reported by
//! `GET_NODE_PROTOCOL_INFO`, plus the device class triplet.
//!
//! Grounded on the teacher's `zwave-serial::command::GetNodeProtocolInfo`
//! response parsing and `zwave-core::definitions::node_info`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceClass {
    pub basic: u8,
    pub generic: u8,
    pub specific: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRate {
    ZWave9k6,
    ZWave40k,
    ZWave100k,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeProtocolInfo {
    pub listening: bool,
    pub frequent_listening: bool,
    pub routing: bool,
    pub supports_beaming: bool,
    pub supports_security: bool,
    pub max_baud_rate: DataRate,
    pub device_class: DeviceClass,
}

impl NodeProtocolInfo {
    /// A node participates in wake-up based delivery when it is neither
    /// always-listening nor frequently-listening (spec.md §4.6).
    pub fn is_sleeping(&self) -> bool {
        !self.listening && !self.frequent_listening
    }
}

impl Default for NodeProtocolInfo {
    fn default() -> Self {
        Self {
            listening: false,
            frequent_listening: false,
            routing: false,
            supports_beaming: false,
            supports_security: false,
            max_baud_rate: DataRate::ZWave9k6,
            device_class: DeviceClass::default(),
        }
    }
}
