//! Door Lock CC (0x62): operation get/set/report, the target of scenario
//! S5's encrypted send. No teacher module covers this class; laid out like
//! `basic.rs`'s triad.

use crate::envelope::{CCEnvelope, CommandClassHandler, ValueUpdate};
use derive_try_from_primitive::TryFromPrimitive;
use zwave_core::command_classes::CommandClasses;
use zwave_core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum DoorLockCommand {
    OperationSet = 0x01,
    OperationGet = 0x02,
    OperationReport = 0x03,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DoorLockMode {
    Unsecured = 0x00,
    Secured = 0xff,
}

pub fn operation_set(mode: DoorLockMode) -> CCEnvelope {
    CCEnvelope::new(CommandClasses::DoorLock, DoorLockCommand::OperationSet as u8, vec![mode as u8])
}

pub fn operation_get() -> CCEnvelope {
    CCEnvelope::new(CommandClasses::DoorLock, DoorLockCommand::OperationGet as u8, vec![])
}

#[derive(Debug, Default)]
pub struct DoorLockCC;

impl CommandClassHandler for DoorLockCC {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::DoorLock
    }

    fn version(&self) -> u8 {
        1
    }

    fn on_application_command(&mut self, command: u8, payload: &[u8]) -> Option<ValueUpdate> {
        if command != DoorLockCommand::OperationReport as u8 {
            return None;
        }
        let mode = *payload.first()?;
        Some(ValueUpdate { index: 0, value: Value::Bool(mode == DoorLockMode::Secured as u8) })
    }

    fn request_value(&self, _index: u8, _instance: u8) -> Option<CCEnvelope> {
        Some(operation_get())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn operation_set_locked_matches_s5_scenario_payload() {
        let env = operation_set(DoorLockMode::Secured);
        assert_eq!(env.encode(), vec![0x62, 0x01, 0xff]);
    }
}
