//! Configuration CC (0x70): vendor-defined per-parameter settings, queried
//! during the interview's Configuration stage. No teacher module covers
//! this class; laid out like `basic.rs`'s get/set/report triad, with the
//! parameter-number prefix byte every Configuration frame carries.

use crate::envelope::{CCEnvelope, CommandClassHandler, ValueUpdate};
use derive_try_from_primitive::TryFromPrimitive;
use zwave_core::command_classes::CommandClasses;
use zwave_core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ConfigurationCommand {
    Set = 0x04,
    Get = 0x05,
    Report = 0x06,
}

pub fn get(parameter: u8) -> CCEnvelope {
    CCEnvelope::new(CommandClasses::Configuration, ConfigurationCommand::Get as u8, vec![parameter])
}

pub fn set(parameter: u8, size: u8, value: i32) -> CCEnvelope {
    let mut payload = vec![parameter, size];
    payload.extend_from_slice(&value.to_be_bytes()[4 - size as usize..]);
    CCEnvelope::new(CommandClasses::Configuration, ConfigurationCommand::Set as u8, payload)
}

#[derive(Debug, Default)]
pub struct ConfigurationCC {
    pub known_parameters: Vec<u8>,
}

impl CommandClassHandler for ConfigurationCC {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Configuration
    }

    fn version(&self) -> u8 {
        1
    }

    fn on_application_command(&mut self, command: u8, payload: &[u8]) -> Option<ValueUpdate> {
        if command != ConfigurationCommand::Report as u8 || payload.len() < 3 {
            return None;
        }
        let parameter = payload[0];
        let size = payload[1] as usize;
        if payload.len() < 2 + size || size == 0 || size > 4 {
            return None;
        }
        let mut bytes = [0u8; 4];
        bytes[4 - size..].copy_from_slice(&payload[2..2 + size]);
        Some(ValueUpdate { index: parameter, value: Value::Int(i32::from_be_bytes(bytes)) })
    }

    fn request_value(&self, index: u8, _instance: u8) -> Option<CCEnvelope> {
        Some(get(index))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_packs_parameter_size_and_value() {
        let env = set(5, 1, 3);
        assert_eq!(env.payload, vec![5, 1, 3]);
    }

    #[test]
    fn report_round_trips_through_on_application_command() {
        let mut cc = ConfigurationCC::default();
        let update = cc
            .on_application_command(ConfigurationCommand::Report as u8, &[5, 1, 3])
            .unwrap();
        assert_eq!(update.index, 5);
        assert_eq!(update.value, Value::Int(3));
    }
}
