//! Basic CC (0x20): generic get/set/report, used as a lowest-common-
//! denominator actuator control and as the S1/S6 scenario payload. Grounded
//! on the teacher's `commandclass::basic`, trimmed to the plain get/set/
//! report triad (no duration/target-value split, which this crate doesn't
//! model as a value-registry).

use crate::envelope::{CCEnvelope, CommandClassHandler, ValueUpdate};
use derive_try_from_primitive::TryFromPrimitive;
use zwave_core::command_classes::CommandClasses;
use zwave_core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum BasicCommand {
    Set = 0x01,
    Get = 0x02,
    Report = 0x03,
}

pub fn set(value: u8) -> CCEnvelope {
    CCEnvelope::new(CommandClasses::Basic, BasicCommand::Set as u8, vec![value])
}

pub fn get() -> CCEnvelope {
    CCEnvelope::new(CommandClasses::Basic, BasicCommand::Get as u8, vec![])
}

#[derive(Debug, Default)]
pub struct BasicCC;

impl CommandClassHandler for BasicCC {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Basic
    }

    fn version(&self) -> u8 {
        2
    }

    fn on_application_command(&mut self, command: u8, payload: &[u8]) -> Option<ValueUpdate> {
        if command != BasicCommand::Report as u8 {
            return None;
        }
        let current_value = *payload.first()?;
        Some(ValueUpdate { index: 0, value: Value::Byte(current_value) })
    }

    fn request_value(&self, _index: u8, _instance: u8) -> Option<CCEnvelope> {
        Some(get())
    }
}
