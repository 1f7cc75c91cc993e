//! Manufacturer Specific CC (0x72): manufacturer/product identification
//! queried once during the interview's ManufacturerSpecific1 stage.
//! Grounded on the teacher's `commandclass::manufacturer_specific`, trimmed
//! to the Get/Report pair (device-specific get/report is out of scope for
//! this driver's interview).

use crate::envelope::{CCEnvelope, CommandClassHandler, ValueUpdate};
use derive_try_from_primitive::TryFromPrimitive;
use zwave_core::command_classes::CommandClasses;
use zwave_core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ManufacturerSpecificCommand {
    Get = 0x04,
    Report = 0x05,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManufacturerSpecificReport {
    pub manufacturer_id: u16,
    pub product_type: u16,
    pub product_id: u16,
}

impl ManufacturerSpecificReport {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < 6 {
            return None;
        }
        Some(Self {
            manufacturer_id: u16::from_be_bytes([payload[0], payload[1]]),
            product_type: u16::from_be_bytes([payload[2], payload[3]]),
            product_id: u16::from_be_bytes([payload[4], payload[5]]),
        })
    }
}

pub fn get() -> CCEnvelope {
    CCEnvelope::new(CommandClasses::ManufacturerSpecific, ManufacturerSpecificCommand::Get as u8, vec![])
}

#[derive(Debug, Default)]
pub struct ManufacturerSpecificCC;

impl CommandClassHandler for ManufacturerSpecificCC {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::ManufacturerSpecific
    }

    fn version(&self) -> u8 {
        2
    }

    fn on_application_command(&mut self, command: u8, payload: &[u8]) -> Option<ValueUpdate> {
        if command != ManufacturerSpecificCommand::Report as u8 {
            return None;
        }
        let report = ManufacturerSpecificReport::parse(payload)?;
        Some(ValueUpdate { index: 0, value: Value::Int(report.manufacturer_id as i32) })
    }

    fn request_value(&self, _index: u8, _instance: u8) -> Option<CCEnvelope> {
        Some(get())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn report_parses_three_16bit_fields() {
        let report = ManufacturerSpecificReport::parse(&[0x00, 0x63, 0x00, 0x01, 0x00, 0x02]).unwrap();
        assert_eq!(report.manufacturer_id, 0x63);
        assert_eq!(report.product_type, 0x01);
        assert_eq!(report.product_id, 0x02);
    }
}
