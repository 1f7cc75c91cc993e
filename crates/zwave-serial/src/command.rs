//! Serial API command envelopes: the unit of work the queue scheduler and
//! transaction engine push through the transport.
//!
//! Grounded on the teacher's `zwave-driver::serial_api` actor (the
//! `expects_response`/`expects_callback` split, per-command callback id) and
//! on `zwave-core::wrapping_counter::WrappingCounter` for callback
//! allocation, translated from the teacher's actor/channel model to the
//! plain struct this crate's blocking transaction engine matches against
//! (spec.md §3).

use crate::frame::{DataFrame, FrameType};
use zwave_core::ids::NodeId;
use zwave_core::wrapping_counter::WrappingCounter;

pub use crate::function_type::FunctionType;

/// Bitmap attached to SendData-family requests (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransmitOptions(u8);

impl TransmitOptions {
    pub const ACK: Self = Self(0x01);
    pub const AUTO_ROUTE: Self = Self(0x04);
    pub const EXPLORE: Self = Self(0x20);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TransmitOptions {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A Serial API request together with everything the transaction engine
/// needs to recognize its reply and callback, and to retry it on failure.
#[derive(Debug, Clone)]
pub struct Message {
    pub function: FunctionType,
    pub payload: Vec<u8>,
    /// Node this message targets, if any (used for wake-up queue routing).
    pub node_id: Option<NodeId>,
    /// Callback id embedded in the payload for SendData-family commands that
    /// report completion asynchronously via `ApplicationCommandHandler`-style
    /// callback frames.
    pub callback_id: Option<u8>,
    /// This request's response is expected to arrive as a Response frame
    /// carrying the same function id, before any callback.
    pub expects_response: bool,
    /// This request's completion is reported via a later callback frame
    /// (matched on `callback_id`), not just the immediate response.
    pub expects_callback: bool,
    /// Number of send attempts made so far (spec.md §3 retry/timeout rules).
    pub attempts: u8,
    /// True once this message has been wrapped by the Security (S0) layer.
    pub encrypted: bool,
    /// For sends awaiting an `ApplicationCommandHandler` reply rather than a
    /// callback frame, the command class id that reply must carry.
    pub expected_command_class: Option<u8>,
}

impl Message {
    pub fn new(function: FunctionType, payload: Vec<u8>) -> Self {
        Self {
            function,
            payload,
            node_id: None,
            callback_id: None,
            expects_response: true,
            expects_callback: false,
            attempts: 0,
            encrypted: false,
            expected_command_class: None,
        }
    }

    pub fn for_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    /// Marks this send as completed by an `ApplicationCommandHandler` reply
    /// carrying `cc_id`, rather than by a callback frame (spec.md §4.4).
    pub fn expecting_command_class(mut self, cc_id: u8) -> Self {
        self.expected_command_class = Some(cc_id);
        self
    }

    /// Allocates a fresh callback id from the shared counter and marks this
    /// message as callback-bearing, appending the id to its payload as the
    /// Serial API convention requires for SendData-family commands.
    pub fn with_callback(mut self, counter: &mut WrappingCounter<u8>) -> Self {
        let id = counter.increment();
        self.callback_id = Some(id);
        self.expects_callback = true;
        self.payload.push(id);
        self
    }

    pub fn to_frame(&self) -> DataFrame {
        DataFrame::new(FrameType::Request, self.function as u8, self.payload.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transmit_options_union_and_contains() {
        let opts = TransmitOptions::ACK | TransmitOptions::AUTO_ROUTE;
        assert!(opts.contains(TransmitOptions::ACK));
        assert!(opts.contains(TransmitOptions::AUTO_ROUTE));
        assert!(!opts.contains(TransmitOptions::EXPLORE));
        assert_eq!(opts.bits(), 0x05);
    }

    #[test]
    fn message_with_callback_appends_id_to_payload() {
        let mut counter = WrappingCounter::<u8>::new();
        let msg = Message::new(FunctionType::SendData, vec![0x05, 0x03, 0x20, 0x01, 0xff])
            .for_node(NodeId::from(5u8))
            .with_callback(&mut counter);
        assert_eq!(msg.callback_id, Some(1));
        assert!(msg.expects_callback);
        assert_eq!(*msg.payload.last().unwrap(), 1);
    }

    #[test]
    fn to_frame_round_trips_through_the_codec() {
        let msg = Message::new(FunctionType::GetVersion, vec![]);
        let frame = msg.to_frame();
        let encoded = frame.encode();
        let (_, outcome) = crate::frame::parse_one(&encoded).unwrap();
        assert_eq!(
            outcome,
            crate::frame::ParseOutcome::Frame(crate::frame::RawFrame::Data(frame))
        );
    }
}
