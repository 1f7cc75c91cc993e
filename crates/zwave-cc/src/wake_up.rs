//! Wake Up CC (0x84): lets a battery node advertise its wake interval and
//! announce that it has gone back to sleep. The driver's wake-up deferral
//! queue (§4.6) depends on recognizing `Notification` and
//! `NoMoreInformation` on the wire; `IntervalSet`/`Get`/`Report` are carried
//! for completeness of the interview's WakeUp stage. No teacher module
//! covers this class; command ids are the public Z-Wave CC registry values,
//! laid out the way `basic.rs`/`manufacturer_specific.rs` lay out their
//! command enums.

use crate::envelope::{CCEnvelope, CommandClassHandler, ValueUpdate};
use derive_try_from_primitive::TryFromPrimitive;
use zwave_core::command_classes::CommandClasses;
use zwave_core::ids::NodeId;
use zwave_core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum WakeUpCommand {
    IntervalSet = 0x04,
    IntervalGet = 0x05,
    IntervalReport = 0x06,
    Notification = 0x07,
    NoMoreInformation = 0x08,
}

pub fn interval_get() -> CCEnvelope {
    CCEnvelope::new(CommandClasses::WakeUp, WakeUpCommand::IntervalGet as u8, vec![])
}

pub fn interval_set(seconds: u32, controller_node_id: NodeId) -> CCEnvelope {
    let [_, b1, b2, b3] = seconds.to_be_bytes();
    CCEnvelope::new(
        CommandClasses::WakeUp,
        WakeUpCommand::IntervalSet as u8,
        vec![b1, b2, b3, u8::from(controller_node_id)],
    )
}

pub fn no_more_information() -> CCEnvelope {
    CCEnvelope::new(CommandClasses::WakeUp, WakeUpCommand::NoMoreInformation as u8, vec![])
}

#[derive(Debug, Default)]
pub struct WakeUpCC;

impl CommandClassHandler for WakeUpCC {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::WakeUp
    }

    fn version(&self) -> u8 {
        2
    }

    fn on_application_command(&mut self, command: u8, payload: &[u8]) -> Option<ValueUpdate> {
        if command != WakeUpCommand::IntervalReport as u8 || payload.len() < 3 {
            return None;
        }
        let seconds = u32::from_be_bytes([0, payload[0], payload[1], payload[2]]);
        Some(ValueUpdate { index: 0, value: Value::Int(seconds as i32) })
    }

    fn request_value(&self, _index: u8, _instance: u8) -> Option<CCEnvelope> {
        Some(interval_get())
    }
}
