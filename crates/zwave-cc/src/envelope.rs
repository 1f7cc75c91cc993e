//! The wire envelope every command class frame shares: CC id, command byte,
//! command-specific payload. spec.md §1 scopes concrete CC decoders as
//! external collaborators — only this contract, plus the handful of classes
//! the driver itself must speak to (interview, wake-up, security), belongs
//! here. Grounded on the teacher's `CCId`/`CCParsable`/`SerializableWith`
//! split, collapsed into one envelope type since this crate doesn't carry
//! the teacher's value-metadata registry.

use zwave_core::command_classes::CommandClasses;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CCEnvelope {
    pub cc_id: CommandClasses,
    pub command: u8,
    pub payload: Vec<u8>,
}

impl CCEnvelope {
    pub fn new(cc_id: CommandClasses, command: u8, payload: Vec<u8>) -> Self {
        Self { cc_id, command, payload }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.payload.len());
        out.push(self.cc_id as u8);
        out.push(self.command);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let &[cc_id, command, ref payload @ ..] = bytes else {
            return None;
        };
        Some(Self { cc_id: CommandClasses::from_u8(cc_id)?, command, payload: payload.to_vec() })
    }
}

/// A value change surfaced by a command class while handling an inbound
/// application command (glossary: `on_application_command`).
#[derive(Debug, Clone, PartialEq)]
pub struct ValueUpdate {
    pub index: u8,
    pub value: zwave_core::value::Value,
}

/// Per-node polymorphic command class contract (glossary: CommandClass).
/// Implementors carry their own version/capability state; the driver holds
/// one boxed instance per (node, cc id) pair.
pub trait CommandClassHandler: Send {
    fn cc_id(&self) -> CommandClasses;
    fn version(&self) -> u8;

    /// Handles an inbound application command addressed to this class,
    /// returning the value it produced, if any.
    fn on_application_command(&mut self, command: u8, payload: &[u8]) -> Option<ValueUpdate>;

    /// Builds the envelope for this class's "supported/get capabilities"
    /// query, issued once during the interview's Static stage.
    fn supported_get(&self) -> Option<CCEnvelope> {
        None
    }

    /// Builds the envelope to (re-)request the value at `index`, issued
    /// during the Dynamic interview stage and by polling.
    fn request_value(&self, index: u8, instance: u8) -> Option<CCEnvelope>;
}
