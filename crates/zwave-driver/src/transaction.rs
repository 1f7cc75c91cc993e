//! Transaction engine (spec.md §4.4): correlates inbound frames with the
//! message currently in flight via callback id, expected reply/class/node,
//! drives retry and timeout, and routes exhausted sends to the wake-up
//! queue for sleeping targets.
//!
//! Grounded on the teacher's `serial_api_machine` state machine
//! (`expects_response`/`expects_callback` split and the CAN/NAK/ACK
//! handling it drives), reworked from its async actor loop into the plain
//! state struct this crate's blocking driver thread steps directly.

use std::time::{Duration, Instant};
use zwave_core::ids::NodeId;
use zwave_serial::frame::RawFrame;
use zwave_serial::function_type::FunctionType;

use crate::queue::QueueItem;

pub const ACK_TIMEOUT: Duration = Duration::from_millis(1500);
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(40);
pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

/// Function ids whose reply inherently carries no source node id (spec.md
/// §4.4's `IsExpectedReply` allow-list).
const SOURCELESS_REPLY_FUNCTIONS: &[u8] = &[
    0x41, // GetNodeProtocolInfo
    0x46, // AssignReturnRoute
    0x13, // SendData
    0x12, // SendNodeInformation
    0x48, // RequestNodeNeighborUpdate
    0x52, // EnableSuc
    0x54, // SetSucNodeId
    0x80, // GetRoutingInfo
    0x60, // RequestNodeInfo
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The in-flight message completed; the engine is idle again.
    Complete,
    /// The frame was consumed but the transaction is still in flight.
    Pending,
    /// The frame wasn't for the current transaction (or there is none).
    Unrelated,
    /// The controller signaled CAN; the message must be resent with an
    /// incremented attempt count.
    Resend,
}

pub struct InFlight {
    pub item: QueueItem,
    pub waiting_for_ack: bool,
    pub expected_callback_id: Option<u8>,
    pub expected_reply: Option<u8>,
    pub expected_command_class: Option<u8>,
    pub expected_node_id: Option<NodeId>,
    pub sent_at: Instant,
    pub max_attempts: u8,
}

impl InFlight {
    pub fn start(item: QueueItem, max_attempts: u8) -> Self {
        let expected_reply = item.message.expects_response.then_some(item.message.function as u8);
        let expected_callback_id =
            if item.message.expects_callback { item.message.callback_id } else { None };
        let expected_node_id = item.target_node;
        let expected_command_class = item.message.expected_command_class;
        Self {
            item,
            waiting_for_ack: true,
            expected_callback_id,
            expected_reply,
            expected_command_class,
            expected_node_id,
            sent_at: Instant::now(),
            max_attempts,
        }
    }

    fn is_expected_reply(&self, function: u8, source: Option<NodeId>) -> bool {
        match self.expected_node_id {
            None => true,
            Some(node_id) if u8::from(node_id) == 255 => true,
            _ => match source {
                None | Some(zwave_core::ids::NODE_ID_UNSPECIFIED) => true,
                Some(src) => {
                    SOURCELESS_REPLY_FUNCTIONS.contains(&function) || Some(src) == self.expected_node_id
                }
            },
        }
    }

    /// Callback ids 1 and 2 are reserved for nonce get/report and never
    /// signal completion of an ordinary transaction (spec.md §4.4).
    fn is_reserved_callback(id: u8) -> bool {
        id == 1 || id == 2
    }

    pub fn elapsed_since_sent(&self) -> Duration {
        self.sent_at.elapsed()
    }

    pub fn timed_out(&self) -> bool {
        self.elapsed_since_sent() >= RETRY_TIMEOUT
    }

    pub fn exhausted(&self) -> bool {
        self.item.message.attempts >= self.max_attempts
    }
}

/// Applies `frame` to `in_flight`, returning the outcome and consuming
/// `in_flight` on completion.
pub fn apply_frame(
    in_flight: &mut Option<InFlight>,
    frame: &RawFrame,
    source_node: Option<NodeId>,
) -> TransactionOutcome {
    let Some(tx) = in_flight.as_mut() else {
        return TransactionOutcome::Unrelated;
    };

    match frame {
        RawFrame::Can => TransactionOutcome::Resend,
        RawFrame::Nak => TransactionOutcome::Resend,
        RawFrame::Ack => {
            tx.waiting_for_ack = false;
            if tx.expected_reply.is_none() && tx.expected_callback_id.is_none() && tx.expected_command_class.is_none() {
                *in_flight = None;
                TransactionOutcome::Complete
            } else {
                TransactionOutcome::Pending
            }
        }
        RawFrame::Data(frame) => {
            use zwave_serial::frame::FrameType;
            match frame.frame_type {
                FrameType::Response => {
                    if tx.expected_reply == Some(frame.function)
                        && tx.is_expected_reply(frame.function, source_node)
                    {
                        if tx.expected_callback_id.is_none() {
                            *in_flight = None;
                            TransactionOutcome::Complete
                        } else {
                            tx.expected_reply = None;
                            TransactionOutcome::Pending
                        }
                    } else {
                        TransactionOutcome::Unrelated
                    }
                }
                FrameType::Request if frame.function == FunctionType::ApplicationCommandHandler as u8 => {
                    // payload = [rxStatus, sourceNodeId, cmdLength, ccId, command, ...],
                    // not a callback-id frame: completion here keys off the
                    // application command class, not a callback id.
                    let (&source_byte, &cc_id) = match (frame.payload.get(1), frame.payload.get(3)) {
                        (Some(s), Some(c)) => (s, c),
                        _ => return TransactionOutcome::Unrelated,
                    };
                    let source = Some(NodeId::from(source_byte));
                    match tx.expected_command_class {
                        Some(expected) if expected == cc_id && tx.is_expected_reply(frame.function, source) => {
                            *in_flight = None;
                            TransactionOutcome::Complete
                        }
                        _ => TransactionOutcome::Unrelated,
                    }
                }
                FrameType::Request => {
                    // Ordinary callback/request frames (e.g. SendData's own
                    // delivery callback) carry the callback id as the first
                    // payload byte, followed by status data.
                    let Some(&callback_id) = frame.payload.first() else {
                        return TransactionOutcome::Unrelated;
                    };
                    if InFlight::is_reserved_callback(callback_id) {
                        return TransactionOutcome::Unrelated;
                    }
                    if Some(callback_id) == tx.expected_callback_id
                        && tx.is_expected_reply(frame.function, source_node)
                    {
                        *in_flight = None;
                        TransactionOutcome::Complete
                    } else {
                        TransactionOutcome::Unrelated
                    }
                }
            }
        }
        RawFrame::Garbage(_) => TransactionOutcome::Unrelated,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::queue::{QueueItem, QueuePriority};
    use zwave_serial::command::Message;
    use zwave_serial::frame::{DataFrame, FrameType};
    use zwave_serial::function_type::FunctionType;

    fn item_expecting_response() -> QueueItem {
        let msg = Message::new(FunctionType::GetVersion, vec![]);
        QueueItem::new(msg, QueuePriority::Command)
    }

    #[test]
    fn ack_without_reply_or_callback_completes() {
        let msg = Message { expects_response: false, ..Message::new(FunctionType::SoftReset, vec![]) };
        let mut in_flight = Some(InFlight::start(QueueItem::new(msg, QueuePriority::Command), 3));
        let outcome = apply_frame(&mut in_flight, &RawFrame::Ack, None);
        assert_eq!(outcome, TransactionOutcome::Complete);
        assert!(in_flight.is_none());
    }

    #[test]
    fn response_completes_when_no_callback_expected() {
        let mut in_flight = Some(InFlight::start(item_expecting_response(), 3));
        apply_frame(&mut in_flight, &RawFrame::Ack, None);
        let reply = DataFrame::new(FrameType::Response, FunctionType::GetVersion as u8, vec![6, 0]);
        let outcome = apply_frame(&mut in_flight, &RawFrame::Data(reply), None);
        assert_eq!(outcome, TransactionOutcome::Complete);
    }

    #[test]
    fn can_signals_resend() {
        let mut in_flight = Some(InFlight::start(item_expecting_response(), 3));
        let outcome = apply_frame(&mut in_flight, &RawFrame::Can, None);
        assert_eq!(outcome, TransactionOutcome::Resend);
    }

    #[test]
    fn callback_completes_a_send_data_transaction() {
        let mut msg = Message::new(FunctionType::SendData, vec![0x05, 0x03, 0x20, 0x01, 0xff]);
        msg.callback_id = Some(0x25);
        msg.expects_callback = true;
        msg.node_id = Some(NodeId::from(5u8));
        let mut in_flight = Some(InFlight::start(QueueItem::new(msg, QueuePriority::Send), 3));

        apply_frame(&mut in_flight, &RawFrame::Ack, None);
        assert!(in_flight.is_some());

        let reply = DataFrame::new(FrameType::Response, FunctionType::SendData as u8, vec![1]);
        let outcome = apply_frame(&mut in_flight, &RawFrame::Data(reply), None);
        assert_eq!(outcome, TransactionOutcome::Pending);

        let callback = DataFrame::new(FrameType::Request, FunctionType::SendData as u8, vec![0x25, 0x00]);
        let outcome = apply_frame(&mut in_flight, &RawFrame::Data(callback), None);
        assert_eq!(outcome, TransactionOutcome::Complete);
    }

    #[test]
    fn application_command_handler_completes_on_matching_command_class_and_source() {
        let mut msg = Message::new(FunctionType::SendData, vec![0x05, 0x03, 0x98, 0x81, 0xab]);
        msg.node_id = Some(NodeId::from(5u8));
        msg.expects_response = false;
        let mut in_flight = Some(InFlight::start(QueueItem::new(msg, QueuePriority::Send), 3));
        in_flight.as_mut().unwrap().expected_command_class = Some(0x98);
        apply_frame(&mut in_flight, &RawFrame::Ack, None);
        assert!(in_flight.is_some());

        // rxStatus, sourceNodeId=5, cmdLength, ccId=0x98 (Security), command
        let frame = DataFrame::new(
            FrameType::Request,
            FunctionType::ApplicationCommandHandler as u8,
            vec![0x00, 0x05, 0x02, 0x98, 0x80],
        );
        let outcome = apply_frame(&mut in_flight, &RawFrame::Data(frame), None);
        assert_eq!(outcome, TransactionOutcome::Complete);
    }

    #[test]
    fn application_command_handler_does_not_complete_on_mismatched_command_class() {
        let mut msg = Message::new(FunctionType::SendData, vec![]);
        msg.node_id = Some(NodeId::from(5u8));
        msg.expects_response = false;
        let mut in_flight = Some(InFlight::start(QueueItem::new(msg, QueuePriority::Send), 3));
        in_flight.as_mut().unwrap().expected_command_class = Some(0x98);
        apply_frame(&mut in_flight, &RawFrame::Ack, None);

        let frame = DataFrame::new(
            FrameType::Request,
            FunctionType::ApplicationCommandHandler as u8,
            vec![0x00, 0x05, 0x02, 0x20, 0x03],
        );
        let outcome = apply_frame(&mut in_flight, &RawFrame::Data(frame), None);
        assert_eq!(outcome, TransactionOutcome::Unrelated);
        assert!(in_flight.is_some());
    }

    #[test]
    fn reserved_callback_ids_never_complete_an_ordinary_transaction() {
        let mut msg = Message::new(FunctionType::SendData, vec![]);
        msg.callback_id = Some(1);
        msg.expects_callback = true;
        let mut in_flight = Some(InFlight::start(QueueItem::new(msg, QueuePriority::Send), 3));
        apply_frame(&mut in_flight, &RawFrame::Ack, None);

        let callback = DataFrame::new(FrameType::Request, FunctionType::SendData as u8, vec![1, 0x00]);
        let outcome = apply_frame(&mut in_flight, &RawFrame::Data(callback), None);
        assert_eq!(outcome, TransactionOutcome::Unrelated);
        assert!(in_flight.is_some());
    }
}
