pub mod cache;
pub mod checksum;
pub mod command_classes;
pub mod error;
pub mod ids;
pub mod notification;
pub mod protocol_info;
pub mod security;
pub mod stats;
pub mod value;
pub mod wrapping_counter;

pub mod prelude {
    pub use crate::command_classes::CommandClasses;
    pub use crate::error::{DriverError, Result};
    pub use crate::ids::{EndpointIndex, HomeId, NodeId, NODE_ID_BROADCAST, NODE_ID_MAX};
    pub use crate::notification::{Notification, UserAlert};
    pub use crate::protocol_info::{DataRate, DeviceClass, NodeProtocolInfo};
    pub use crate::stats::{DriverStatistics, NodeStatistics};
    pub use crate::value::{Genre, Value, ValueId, ValueMetadata};
}
