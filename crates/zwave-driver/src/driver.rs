//! The `Driver`/`Manager` facade (spec.md §5): ties the queue scheduler,
//! transaction engine, node table, wake-up deferral, security glue,
//! controller commands, and notification bus to a transport, the way
//! spec.md's single "Driver thread" does.
//!
//! Grounded on the teacher's abandoned synchronous `serial.rs` prototype
//! for the owning-thread-plus-mutexes shape (the teacher's real driver is
//! an async actor; this crate departs from that on purpose, since spec.md
//! §5 mandates "parallel threads with explicit mutex discipline" rather
//! than an async runtime — see DESIGN.md).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, warn};
use zwave_cc::envelope::CCEnvelope;
use zwave_cc::manufacturer_specific;
use zwave_cc::security as cc_security;
use zwave_cc::wake_up;
use zwave_core::command_classes::CommandClasses;
use zwave_core::ids::{HomeId, NodeId};
use zwave_core::protocol_info::{DataRate, DeviceClass, NodeProtocolInfo};
use zwave_core::value::{Genre, ValueId};
use zwave_core::wrapping_counter::WrappingCounter;
use zwave_serial::command::Message;
use zwave_serial::frame::{DataFrame, FrameType, ParseOutcome, RawFrame};
use zwave_serial::function_type::FunctionType;
use zwave_serial::transport::{Transport, WaitResult};

use crate::controller::{ControllerCommandKind, ControllerCommandQueue, ControllerCommandState};
use crate::interview::{Advance, QueryStage};
use crate::manufacturer_db::ManufacturerSpecificDb;
use crate::node::{Node, ValueKey};
use crate::notification::{DriverStatistics, Notification, NotificationBus};
use crate::poll::PollList;
use crate::queue::{QueueItem, QueuePriority, SendQueue};
use crate::security::{SecureSend, SecurityManager};
use crate::timer::TimerThread;
use crate::transaction::{apply_frame, InFlight, TransactionOutcome, ACK_TIMEOUT, DEFAULT_MAX_ATTEMPTS};
use crate::wakeup::WakeUpQueues;

/// State shared between the driver thread and everything else (the poll
/// thread, application callers, a future `Manager` facade): every field here
/// is reached only through its own mutex.
pub struct Shared {
    pub send_queue: SendQueue,
    pub nodes: Mutex<HashMap<NodeId, Node>>,
    pub notifications: NotificationBus,
    pub wake_up: Mutex<WakeUpQueues>,
    pub controller_commands: Mutex<ControllerCommandQueue>,
    pub security: Mutex<SecurityManager>,
    pub statistics: Mutex<DriverStatistics>,
    pub manufacturer_db: Mutex<ManufacturerSpecificDb>,
    pub poll_list: PollList,
    pub timer: TimerThread,
}

impl Shared {
    pub fn new(encrypt_key: [u8; 16], auth_key: [u8; 16]) -> Self {
        Self {
            send_queue: SendQueue::new(),
            nodes: Mutex::new(HashMap::new()),
            notifications: NotificationBus::new(),
            wake_up: Mutex::new(WakeUpQueues::new()),
            controller_commands: Mutex::new(ControllerCommandQueue::new()),
            security: Mutex::new(SecurityManager::new(encrypt_key, auth_key)),
            statistics: Mutex::new(DriverStatistics::default()),
            manufacturer_db: Mutex::new(ManufacturerSpecificDb::new()),
            poll_list: PollList::new(),
            timer: TimerThread::new(),
        }
    }
}

/// The driver thread's own state: transport, read buffer, in-flight
/// transaction, and the callback-id allocator. Not shared across threads —
/// other threads reach the driver only through `Shared` and `SendQueue`.
pub struct Driver<T: Transport> {
    pub shared: Arc<Shared>,
    transport: T,
    read_buf: VecDeque<u8>,
    scratch: Vec<u8>,
    in_flight: Option<InFlight>,
    callback_counter: WrappingCounter<u8>,
    home_id: HomeId,
    controller_node_id: NodeId,
    exit: Arc<AtomicBool>,
}

impl<T: Transport> Driver<T> {
    pub fn new(transport: T, shared: Arc<Shared>, home_id: HomeId, controller_node_id: NodeId) -> Self {
        let mut callback_counter = WrappingCounter::new_with_max(255u8);
        // Skip the two reserved nonce callback ids so ordinary traffic
        // never collides with them (spec.md §4.4).
        callback_counter.increment();
        callback_counter.increment();
        Self {
            shared,
            transport,
            read_buf: VecDeque::new(),
            scratch: vec![0u8; 256],
            in_flight: None,
            callback_counter,
            home_id,
            controller_node_id,
            exit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn home_id(&self) -> HomeId {
        self.home_id
    }

    pub fn exit_handle(&self) -> Arc<AtomicBool> {
        self.exit.clone()
    }

    pub fn with_callback(&mut self, message: Message) -> Message {
        message.with_callback(&mut self.callback_counter)
    }

    /// Enqueues `item`, routing straight to the wake-up queue instead if its
    /// target is a known sleeping node (spec.md §4.6 trigger 1).
    pub fn send(&self, item: QueueItem) {
        if let Some(node_id) = item.target_node {
            let nodes = self.shared.nodes.lock().unwrap();
            if nodes.get(&node_id).is_some_and(Node::is_sleeping) {
                drop(nodes);
                self.shared.wake_up.lock().unwrap().defer(node_id, item);
                return;
            }
        }
        self.shared.send_queue.push(item);
    }

    /// spec.md §4.3's queue gating: fewer priorities armed while the
    /// manufacturer DB initializes, a message is in flight, or a controller
    /// command is active.
    fn max_priority(&self) -> QueuePriority {
        if self.shared.manufacturer_db.lock().unwrap().is_initializing() {
            return QueuePriority::Controller;
        }
        if self.in_flight.is_some() {
            return QueuePriority::WakeUp;
        }
        if self.shared.controller_commands.lock().unwrap().active().is_some() {
            return QueuePriority::Controller;
        }
        QueuePriority::Poll
    }

    fn write_frame(&mut self, frame: &RawFrame) {
        let bytes = frame.encode();
        let _ = self.transport.write(&bytes);
    }

    /// One iteration of the driver loop: sends the next queued item if idle,
    /// waits for readable bytes (or the transaction timeout), and processes
    /// whatever frames that produces. Exposed standalone so tests can drive
    /// it deterministically without a background thread.
    pub fn step(&mut self) {
        if self.in_flight.is_none() {
            if let Some(item) = self.shared.send_queue.pop(self.max_priority()) {
                self.write_frame(&RawFrame::Data(item.message.to_frame()));
                self.in_flight = Some(InFlight::start(item, DEFAULT_MAX_ATTEMPTS));
            }
        }

        let wait = match &self.in_flight {
            Some(_) => ACK_TIMEOUT,
            None => Duration::from_millis(500),
        };

        match self.transport.wait_readable(wait) {
            Ok(WaitResult::Readable) => self.drain_readable(),
            Ok(WaitResult::TimedOut) => self.handle_timeout(),
            Err(e) => {
                self.shared.statistics.lock().unwrap().record_read_abort();
                warn!("transport error: {e}");
            }
        }
    }

    fn drain_readable(&mut self) {
        if let Ok(n) = self.transport.read(&mut self.scratch) {
            self.read_buf.extend(self.scratch[..n].iter().copied());
        }
        loop {
            let buf: Vec<u8> = self.read_buf.iter().copied().collect();
            match zwave_serial::frame::parse_one(&buf) {
                Ok((remaining, outcome)) => {
                    let consumed = buf.len() - remaining.len();
                    self.read_buf.drain(..consumed);
                    match outcome {
                        ParseOutcome::Frame(frame) => {
                            self.record_inbound(&frame);
                            self.handle_frame(frame);
                        }
                        ParseOutcome::BadChecksum => {
                            self.shared.statistics.lock().unwrap().record_bad_checksum();
                            self.write_frame(&RawFrame::Nak);
                        }
                    }
                    if consumed == 0 {
                        break;
                    }
                }
                Err(nom::Err::Incomplete(_)) => break,
                Err(_) => break,
            }
        }
    }

    /// Bumps the frame-kind counters in `DriverStatistics` for every inbound
    /// frame, independent of whether it turns out to be expected.
    fn record_inbound(&self, frame: &RawFrame) {
        let mut stats = self.shared.statistics.lock().unwrap();
        match frame {
            RawFrame::Data(_) => stats.record_sof(),
            RawFrame::Ack => stats.record_ack(),
            RawFrame::Nak => stats.record_nak(),
            RawFrame::Can => stats.record_can(),
            RawFrame::Garbage(_) => {}
        }
    }

    fn handle_frame(&mut self, frame: RawFrame) {
        if matches!(frame, RawFrame::Data(_)) {
            self.write_frame(&RawFrame::Ack);
        }

        let source_node = self.in_flight.as_ref().and_then(|tx| tx.item.target_node);
        let completed_message = self.in_flight.as_ref().map(|tx| tx.item.message.clone());
        let outcome = apply_frame(&mut self.in_flight, &frame, source_node);

        match outcome {
            TransactionOutcome::Complete => {
                if let Some(node_id) = source_node {
                    if let Some(node) = self.shared.nodes.lock().unwrap().get_mut(&node_id) {
                        node.record_success();
                    }
                }
                debug!("transaction complete");
                if let (Some(node_id), Some(message)) = (source_node, &completed_message) {
                    self.advance_interview_stage(node_id, message, &frame);
                }
            }
            TransactionOutcome::Resend => self.resend_in_flight(),
            TransactionOutcome::Pending | TransactionOutcome::Unrelated => {
                if let RawFrame::Data(_) = &frame {
                    if let Some(node_id) = source_node {
                        if let Some(node) = self.shared.nodes.lock().unwrap().get_mut(&node_id) {
                            node.statistics.record_received();
                        }
                    }
                }
            }
        }

        if let RawFrame::Data(data) = &frame {
            if data.frame_type == FrameType::Request {
                if data.function == FunctionType::ApplicationCommandHandler as u8 {
                    self.handle_application_command(data);
                } else {
                    self.handle_controller_frame(data);
                }
            }
        }
    }

    fn resend_in_flight(&mut self) {
        if let Some(mut tx) = self.in_flight.take() {
            tx.item.message.attempts += 1;
            if tx.item.message.attempts >= tx.max_attempts {
                self.drop_exhausted(tx.item);
            } else {
                if let Some(node_id) = tx.item.target_node {
                    if let Some(node) = self.shared.nodes.lock().unwrap().get_mut(&node_id) {
                        node.statistics.retries += 1;
                    }
                }
                self.write_frame(&RawFrame::Data(tx.item.message.to_frame()));
                tx.sent_at = Instant::now();
                tx.waiting_for_ack = true;
                self.in_flight = Some(tx);
            }
        }
    }

    /// `wait_readable` already blocks for `ACK_TIMEOUT` when a transaction is
    /// in flight, so a `TimedOut` result here means that deadline passed
    /// without a matching frame: resend (or drop, once attempts run out).
    fn handle_timeout(&mut self) {
        if self.in_flight.is_none() {
            return;
        }
        self.resend_in_flight();
    }

    /// A send exhausted its attempts (spec.md §4.4): emit Timeout, bump the
    /// target's error counter, and move any further queued items for a
    /// non-listening target to its wake-up queue.
    fn drop_exhausted(&mut self, item: QueueItem) {
        if let Some(node_id) = item.target_node {
            self.shared.notifications.notify(&Notification::Timeout(node_id));
            let mut nodes = self.shared.nodes.lock().unwrap();
            if let Some(node) = nodes.get_mut(&node_id) {
                node.record_transmission_error();
                if node.is_sleeping() {
                    drop(nodes);
                    let mut drained = self.shared.send_queue.drain_for_node(node_id);
                    drained.insert(0, item);
                    self.shared.wake_up.lock().unwrap().defer_many(node_id, drained);
                }
            }
        }
    }

    pub fn controller_node_id(&self) -> NodeId {
        self.controller_node_id
    }

    /// The transaction currently awaiting completion, if any. Mainly useful
    /// for tests driving `step()` deterministically without a real thread.
    pub fn in_flight(&self) -> Option<&InFlight> {
        self.in_flight.as_ref()
    }

    // --- CC envelope dispatch (spec.md §4.4.1, §4.5, §4.6) -----------------

    /// Decodes an inbound `ApplicationCommandHandler` frame
    /// (`[rxStatus, sourceNodeId, cmdLength, ccId, command, ...]`) and routes
    /// the envelope it carries to security, wake-up, or ordinary CC
    /// handling.
    fn handle_application_command(&mut self, data: &DataFrame) {
        let Some(&source_byte) = data.payload.get(1) else { return };
        let Some(cc_bytes) = data.payload.get(3..) else { return };
        let Some(envelope) = CCEnvelope::decode(cc_bytes) else { return };
        self.dispatch_cc_envelope(NodeId::from(source_byte), envelope);
    }

    fn dispatch_cc_envelope(&mut self, source: NodeId, envelope: CCEnvelope) {
        match envelope.cc_id {
            CommandClasses::Security => self.handle_security_envelope(source, envelope),
            CommandClasses::WakeUp => self.handle_wake_up_envelope(source, envelope),
            _ => self.handle_ordinary_cc_envelope(source, envelope),
        }
    }

    /// Security (S0) nonce exchange and encapsulation (spec.md §4.5): an
    /// inbound NonceGet gets an immediate NonceReport, a NonceReport
    /// unblocks the next secure send, and a CommandEncapsulation is
    /// decrypted and redispatched as its plaintext envelope.
    fn handle_security_envelope(&mut self, source: NodeId, envelope: CCEnvelope) {
        let Ok(command) = cc_security::SecurityCommand::try_from(envelope.command) else { return };
        match command {
            cc_security::SecurityCommand::NonceGet => {
                let report = self.shared.security.lock().unwrap().handle_nonce_get(source);
                if let Ok(report) = report {
                    let payload = send_data_payload(source, &report);
                    let msg = Message::new(FunctionType::SendData, payload).for_node(source);
                    self.send(QueueItem::new(msg, QueuePriority::Command));
                }
            }
            cc_security::SecurityCommand::NonceReport => {
                if let Ok(nonce) = envelope.payload.as_slice().try_into() {
                    self.shared.security.lock().unwrap().handle_nonce_report(source, nonce);
                }
            }
            cc_security::SecurityCommand::CommandEncapsulation => {
                let plaintext =
                    self.shared.security.lock().unwrap().decrypt_from(self.controller_node_id, source, &envelope.payload);
                if let Ok(plaintext) = plaintext {
                    if let Some(inner) = CCEnvelope::decode(&plaintext) {
                        self.dispatch_cc_envelope(source, inner);
                    }
                }
            }
            _ => {}
        }
    }

    /// Queues `plaintext` for `peer` through the Security layer (spec.md
    /// §4.5): if a peer nonce is already cached the ciphertext goes out
    /// immediately wrapped in CommandEncapsulation, otherwise a NonceGet is
    /// sent first and the caller must retry once `NonceReport` arrives.
    pub fn send_secure(&mut self, peer: NodeId, plaintext: &[u8]) -> Result<(), zwave_core::error::SecurityError> {
        let outcome = self.shared.security.lock().unwrap().begin_secure_send(self.controller_node_id, peer, plaintext)?;
        match outcome {
            SecureSend::NeedNonce(envelope) => {
                let msg = Message::new(FunctionType::SendData, send_data_payload(peer, &envelope)).for_node(peer);
                self.send(QueueItem::new(msg, QueuePriority::Command));
            }
            SecureSend::Ready(ciphertext) => {
                let envelope =
                    CCEnvelope::new(CommandClasses::Security, cc_security::SecurityCommand::CommandEncapsulation as u8, ciphertext);
                let msg = Message::new(FunctionType::SendData, send_data_payload(peer, &envelope))
                    .for_node(peer)
                    .expecting_command_class(CommandClasses::Security as u8);
                self.send(QueueItem::new(msg, QueuePriority::Send));
            }
        }
        Ok(())
    }

    /// WakeUpNotification triggers the deferral flush (spec.md §4.6, trigger
    /// one) and, if the node paused mid-interview at the WakeUp stage,
    /// resumes it; everything else on this CC (interval reports) is
    /// ordinary value data.
    fn handle_wake_up_envelope(&mut self, source: NodeId, envelope: CCEnvelope) {
        let Ok(command) = wake_up::WakeUpCommand::try_from(envelope.command) else { return };
        if command != wake_up::WakeUpCommand::Notification {
            self.handle_ordinary_cc_envelope(source, envelope);
            return;
        }

        let nmi_payload = send_data_payload(source, &wake_up::no_more_information());
        let nmi = QueueItem::new(Message::new(FunctionType::SendData, nmi_payload).for_node(source), QueuePriority::WakeUp);
        let flushed = self.shared.wake_up.lock().unwrap().flush(source, nmi);
        for item in flushed {
            self.shared.send_queue.push(QueueItem { priority: QueuePriority::WakeUp, ..item });
        }

        let paused_advance = {
            let mut nodes = self.shared.nodes.lock().unwrap();
            nodes.get_mut(&source).and_then(|node| {
                (node.interview.stage == QueryStage::WakeUp).then(|| node.interview.on_stage_complete(false, true))
            })
        };
        if let Some(advance) = paused_advance {
            self.apply_interview_advance(source, advance);
        }
    }

    /// Ordinary per-CC application data (spec.md §3): hands the command to
    /// the node's registered handler and surfaces whatever value it
    /// produces as `ValueAdded`/`ValueChanged`.
    fn handle_ordinary_cc_envelope(&mut self, source: NodeId, envelope: CCEnvelope) {
        let update = {
            let mut nodes = self.shared.nodes.lock().unwrap();
            let Some(node) = nodes.get_mut(&source) else { return };
            node.record_success();
            let Some(handler) = node.command_classes.get_mut(&envelope.cc_id) else { return };
            let Some(update) = handler.on_application_command(envelope.command, &envelope.payload) else { return };
            let key = ValueKey { command_class: envelope.cc_id, instance: 1, index: update.index };
            let is_new = !node.values.contains_key(&key);
            node.set_value(key, update.value.clone());
            (is_new, update.index)
        };
        let (is_new, index) = update;
        let value_id = ValueId::new(self.home_id, source, Genre::User, envelope.cc_id, 1, index);
        let notification = if is_new { Notification::ValueAdded(value_id) } else { Notification::ValueChanged(value_id) };
        self.shared.notifications.notify(&notification);
    }

    // --- Node interview (spec.md §4.4.1) ------------------------------------

    /// Adds a freshly-discovered node and kicks off its interview at
    /// `QueryStage::None`, which advances immediately to `ProtocolInfo`.
    pub fn add_node(&mut self, node_id: NodeId, protocol_info: NodeProtocolInfo) {
        self.shared.nodes.lock().unwrap().insert(node_id, Node::new(node_id, protocol_info));
        self.shared.notifications.notify(&Notification::NodeAdded(node_id));
        self.start_interview_stage(node_id, QueryStage::None);
    }

    /// Loads the persisted cache (spec.md §4.8) and resumes every cached
    /// node's interview from wherever it left off.
    pub fn load_cache(&mut self, dir: &std::path::Path) -> Result<(), zwave_core::cache::CacheError> {
        let Some(cache) = crate::cache::read_from_dir(dir, self.home_id)? else { return Ok(()) };
        let nodes = crate::cache::load_nodes(&cache);
        let stages: Vec<(NodeId, QueryStage)> = nodes.iter().map(|(id, n)| (*id, n.interview.stage)).collect();
        self.shared.nodes.lock().unwrap().extend(nodes);
        for (node_id, stage) in stages {
            self.start_interview_stage(node_id, stage);
        }
        Ok(())
    }

    pub fn save_cache(&self, dir: &std::path::Path) -> Result<(), zwave_core::cache::CacheError> {
        let nodes = self.shared.nodes.lock().unwrap();
        let cache = crate::cache::build_cache_xml(self.home_id, self.controller_node_id, &nodes);
        drop(nodes);
        crate::cache::write_to_dir(dir, self.home_id, &cache)
    }

    /// Checks whether `message`/`frame` is the query this node's current
    /// interview stage is waiting on and, if so, advances it.
    fn advance_interview_stage(&mut self, node_id: NodeId, message: &Message, frame: &RawFrame) {
        let stage = {
            let nodes = self.shared.nodes.lock().unwrap();
            match nodes.get(&node_id) {
                Some(node) => node.interview.stage,
                None => return,
            }
        };
        let matches_stage = match stage {
            QueryStage::ProtocolInfo => message.function == FunctionType::GetNodeProtocolInfo,
            QueryStage::Probe => {
                message.function == FunctionType::SendData && message.expected_command_class.is_none()
            }
            QueryStage::WakeUp => message.expected_command_class == Some(CommandClasses::WakeUp as u8),
            QueryStage::ManufacturerSpecific1 => {
                message.expected_command_class == Some(CommandClasses::ManufacturerSpecific as u8)
            }
            _ => false,
        };
        if !matches_stage {
            return;
        }

        if stage == QueryStage::ProtocolInfo {
            if let RawFrame::Data(data) = frame {
                if let Some(info) = decode_node_protocol_info(&data.payload) {
                    if let Some(node) = self.shared.nodes.lock().unwrap().get_mut(&node_id) {
                        node.protocol_info = info;
                    }
                }
            }
        }

        let advance = {
            let mut nodes = self.shared.nodes.lock().unwrap();
            let Some(node) = nodes.get_mut(&node_id) else { return };
            let sleeping = node.is_sleeping();
            let has_wake_up = node.has_command_class(CommandClasses::WakeUp);
            node.interview.on_stage_complete(sleeping, has_wake_up)
        };
        self.apply_interview_advance(node_id, advance);
    }

    fn apply_interview_advance(&mut self, node_id: NodeId, advance: Advance) {
        match advance {
            Advance::To(QueryStage::Complete) => {
                self.shared.notifications.notify(&Notification::NodeQueriesComplete(node_id));
                self.check_all_nodes_queried();
            }
            Advance::To(stage) => self.start_interview_stage(node_id, stage),
            Advance::PausedForSleep(_) => {}
            Advance::Retry => {
                let stage = self.shared.nodes.lock().unwrap().get(&node_id).map(|n| n.interview.stage);
                if let Some(stage) = stage {
                    self.start_interview_stage(node_id, stage);
                }
            }
            Advance::ShortCircuitDead => self.check_all_nodes_queried(),
        }
    }

    /// Issues the wire query for `stage`, if this crate models one; stages
    /// without a modeled query (see DESIGN.md) advance immediately.
    fn start_interview_stage(&mut self, node_id: NodeId, stage: QueryStage) {
        match stage {
            QueryStage::Complete => {}
            QueryStage::ProtocolInfo => {
                // answered by the controller chip from data it already holds,
                // not relayed to the node itself, so it bypasses the sleeping-
                // node deferral `self.send` applies to everything else.
                let msg = Message::new(FunctionType::GetNodeProtocolInfo, vec![node_id.as_u8()])
                    .for_node(node_id);
                self.shared.send_queue.push(QueueItem::new(msg, QueuePriority::Query));
            }
            QueryStage::Probe => {
                let envelope = CCEnvelope::new(CommandClasses::NoOperation, 0, vec![]);
                let msg = self
                    .with_callback(Message::new(FunctionType::SendData, send_data_payload(node_id, &envelope)).for_node(node_id));
                self.send(QueueItem::new(msg, QueuePriority::NoOp));
            }
            QueryStage::WakeUp => {
                let has_wake_up =
                    self.shared.nodes.lock().unwrap().get(&node_id).is_some_and(|n| n.has_command_class(CommandClasses::WakeUp));
                if !has_wake_up {
                    self.complete_stage_immediately(node_id);
                    return;
                }
                let envelope = wake_up::interval_get();
                let mut msg = Message::new(FunctionType::SendData, send_data_payload(node_id, &envelope))
                    .for_node(node_id)
                    .expecting_command_class(CommandClasses::WakeUp as u8);
                msg.expects_response = false;
                self.send(QueueItem::new(msg, QueuePriority::Query));
            }
            QueryStage::ManufacturerSpecific1 => {
                let has_ms = self
                    .shared
                    .nodes
                    .lock()
                    .unwrap()
                    .get(&node_id)
                    .is_some_and(|n| n.has_command_class(CommandClasses::ManufacturerSpecific));
                if !has_ms {
                    self.complete_stage_immediately(node_id);
                    return;
                }
                let envelope = manufacturer_specific::get();
                let mut msg = Message::new(FunctionType::SendData, send_data_payload(node_id, &envelope))
                    .for_node(node_id)
                    .expecting_command_class(CommandClasses::ManufacturerSpecific as u8);
                msg.expects_response = false;
                self.send(QueueItem::new(msg, QueuePriority::Query));
            }
            _ => self.complete_stage_immediately(node_id),
        }
    }

    fn complete_stage_immediately(&mut self, node_id: NodeId) {
        let advance = {
            let mut nodes = self.shared.nodes.lock().unwrap();
            let Some(node) = nodes.get_mut(&node_id) else { return };
            let sleeping = node.is_sleeping();
            let has_wake_up = node.has_command_class(CommandClasses::WakeUp);
            node.interview.on_stage_complete(sleeping, has_wake_up)
        };
        self.apply_interview_advance(node_id, advance);
    }

    fn check_all_nodes_queried(&self) {
        let nodes = self.shared.nodes.lock().unwrap();
        if nodes.is_empty() || !nodes.values().all(|n| n.interview.stage.is_complete()) {
            return;
        }
        if nodes.values().any(|n| !n.is_alive()) {
            self.shared.notifications.notify(&Notification::AllNodesQueriedSomeDead);
        } else {
            self.shared.notifications.notify(&Notification::AllNodesQueried);
        }
    }

    // --- Controller commands (spec.md §4.7) ---------------------------------

    /// Maps an inbound Request frame to the active controller command's
    /// progress, advancing (and retiring, if it just finished) it. A
    /// pragmatic simplification: only the function ids that have a direct
    /// `FunctionType` counterpart are recognized, and progress status bytes
    /// are mapped generically rather than per-command (see DESIGN.md).
    fn handle_controller_frame(&mut self, data: &DataFrame) {
        let mut commands = self.shared.controller_commands.lock().unwrap();
        let Some(cmd) = commands.active_mut() else { return };
        if controller_function_for_kind(cmd.kind) != Some(data.function) {
            return;
        }
        let Some(&status) = data.payload.first() else { return };
        if cmd.kind == ControllerCommandKind::AddDevice && matches!(status, 0x03 | 0x04) {
            if let Some(info) = decode_add_node_protocol_info(&data.payload) {
                cmd.collect_protocol_info(info);
            }
        }
        cmd.advance(map_generic_status(status));
        drop(commands);
        self.shared.controller_commands.lock().unwrap().retire_if_done();
    }

    // --- Manufacturer DB (SPEC_FULL.md §4 supplement) -----------------------

    pub fn manufacturer_db_check(&self, config_path: &str, source: &dyn crate::manufacturer_db::RevisionSource) -> crate::manufacturer_db::CheckOutcome {
        self.shared.manufacturer_db.lock().unwrap().check(config_path, source)
    }

    pub fn manufacturer_db_download_finished(&self, config_path: &str, revision: Option<u32>) {
        let mut db = self.shared.manufacturer_db.lock().unwrap();
        db.download_finished(config_path, revision);
        let became_ready = db.mark_ready_if_idle();
        drop(db);
        if became_ready {
            self.shared.notifications.notify(&Notification::ManufacturerSpecificDbReady);
        }
    }
}

/// Builds a SendData payload (`[targetNodeId, cmdLength, ccId, command,
/// ...ccPayload]`) for `envelope`.
fn send_data_payload(node_id: NodeId, envelope: &CCEnvelope) -> Vec<u8> {
    let body = envelope.encode();
    let mut out = Vec::with_capacity(2 + body.len());
    out.push(node_id.as_u8());
    out.push(body.len() as u8);
    out.extend(body);
    out
}

/// Decodes a GetNodeProtocolInfo Response payload
/// (`[capability, security, reserved, basic, generic, specific]`). No
/// teacher or pack parser covers this wire layout (spec.md only specifies
/// interview stage order, not the capability bit positions), so this is an
/// original, best-effort decode documented in DESIGN.md.
fn decode_node_protocol_info(payload: &[u8]) -> Option<NodeProtocolInfo> {
    let &[capability, security, _reserved, basic, generic, specific] = payload else { return None };
    Some(NodeProtocolInfo {
        listening: capability & 0x80 != 0,
        frequent_listening: capability & 0x03 != 0,
        routing: capability & 0x40 != 0,
        supports_beaming: security & 0x40 != 0,
        supports_security: security & 0x01 != 0,
        max_baud_rate: match (capability >> 3) & 0x03 {
            2 => DataRate::ZWave100k,
            1 => DataRate::ZWave40k,
            _ => DataRate::ZWave9k6,
        },
        device_class: DeviceClass { basic, generic, specific },
    })
}

/// Best-effort device-class extraction from an
/// AddNodeToNetwork(AddingSlave/AddingController) callback payload
/// (`[status, sourceNodeId, infoLength, basic, generic, specific, ...]`).
fn decode_add_node_protocol_info(payload: &[u8]) -> Option<NodeProtocolInfo> {
    let basic = *payload.get(3)?;
    let generic = *payload.get(4)?;
    let specific = *payload.get(5)?;
    Some(NodeProtocolInfo { device_class: DeviceClass { basic, generic, specific }, ..Default::default() })
}

/// The subset of `ControllerCommandKind` whose progress frames carry a
/// `FunctionType` this crate already models (see DESIGN.md: kinds like
/// `ReceiveConfiguration`/`CreateButton`/`DeleteButton`/`ReplicationSend`
/// have no Serial API function id of their own to key off of).
fn controller_function_for_kind(kind: ControllerCommandKind) -> Option<u8> {
    use ControllerCommandKind::*;
    match kind {
        AddDevice => Some(FunctionType::AddNodeToNetwork as u8),
        RemoveDevice => Some(FunctionType::RemoveNodeFromNetwork as u8),
        CreateNewPrimary => Some(FunctionType::CreateNewPrimary as u8),
        RequestNodeNeighborUpdate => Some(FunctionType::RequestNodeNeighborUpdate as u8),
        AssignReturnRoute => Some(FunctionType::AssignReturnRoute as u8),
        DeleteReturnRoute => Some(FunctionType::DeleteReturnRoute as u8),
        RequestNetworkUpdate => Some(FunctionType::RequestNetworkUpdate as u8),
        RemoveFailedNode => Some(FunctionType::RemoveFailedNodeId as u8),
        ReplaceFailedNode => Some(FunctionType::ReplaceFailedNode as u8),
        HasNodeFailed => Some(FunctionType::IsFailedNodeId as u8),
        SetLearnMode => Some(FunctionType::SetLearnMode as u8),
        ReceiveConfiguration | ReplicationSend | CreateButton | DeleteButton | RequestNodeInfo => None,
    }
}

/// Maps a progress status byte to a `ControllerCommandState`. OpenZWave's
/// per-command status enums share the same DONE(0x05..0x06)/FAILED(0x07)
/// tail; anything else is treated as still in progress (see DESIGN.md).
fn map_generic_status(status: u8) -> ControllerCommandState {
    match status {
        0x05 | 0x06 => ControllerCommandState::Completed,
        0x07 => ControllerCommandState::Failed,
        _ => ControllerCommandState::InProgress,
    }
}

/// Spawns a background thread draining `shared.poll_list` (spec.md §4.9):
/// idles while the network hasn't finished its first round of awake-node
/// queries or the list is empty, otherwise steps it once per
/// `interval_for_cycle` and enqueues a refresh for whatever comes due.
pub fn spawn_poll_thread(
    shared: Arc<Shared>,
    poll_interval: Duration,
    per_poll_spacing: bool,
    exit: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || loop {
        if exit.load(Ordering::SeqCst) {
            return;
        }
        let awake_nodes_queried = {
            let nodes = shared.nodes.lock().unwrap();
            nodes.values().all(|n| n.is_sleeping() || n.interview.stage.is_complete())
        };
        if crate::poll::should_idle(awake_nodes_queried, shared.poll_list.is_empty()) {
            std::thread::sleep(crate::poll::IDLE_WAIT);
            continue;
        }
        if let crate::poll::PollStep::Due(value_id) = shared.poll_list.step() {
            enqueue_poll_refresh(&shared, value_id);
        }
        std::thread::sleep(shared.poll_list.interval_for_cycle(poll_interval, per_poll_spacing));
    })
}

fn enqueue_poll_refresh(shared: &Arc<Shared>, value_id: ValueId) {
    let payload = {
        let mut nodes = shared.nodes.lock().unwrap();
        let Some(node) = nodes.get_mut(&value_id.node_id) else { return };
        if node.is_sleeping() {
            return;
        }
        let Some(handler) = node.command_classes.get(&value_id.command_class) else { return };
        let Some(envelope) = handler.request_value(value_id.index, value_id.instance) else { return };
        send_data_payload(value_id.node_id, &envelope)
    };
    let msg = Message::new(FunctionType::SendData, payload).for_node(value_id.node_id);
    shared.send_queue.push(QueueItem::new(msg, QueuePriority::Poll));
}

#[cfg(test)]
mod test {
    use super::*;
    use zwave_core::protocol_info::NodeProtocolInfo;
    use zwave_serial::function_type::FunctionType;
    use zwave_serial::transport::mock::MockTransport;

    fn driver(transport: MockTransport) -> Driver<MockTransport> {
        let shared = Arc::new(Shared::new([0u8; 16], [0u8; 16]));
        Driver::new(transport, shared, HomeId::new(1), NodeId::from(1u8))
    }

    #[test]
    fn plain_send_completes_on_ack_and_callback() {
        let transport = MockTransport::new();
        let mut d = driver(transport.clone());
        d.shared.nodes.lock().unwrap().insert(
            NodeId::from(5u8),
            Node::new(NodeId::from(5u8), NodeProtocolInfo { listening: true, ..Default::default() }),
        );

        let msg = d.with_callback(
            Message::new(FunctionType::SendData, vec![0x05, 0x03, 0x20, 0x01, 0xff]).for_node(NodeId::from(5u8)),
        );
        d.send(QueueItem::new(msg, QueuePriority::Send));

        // step 1: pops the item, writes the frame, waits for the ACK.
        transport.push_inbound(&zwave_serial::frame::RawFrame::Ack.encode());
        d.step();
        assert!(d.in_flight.is_some());

        let callback_id = d.in_flight.as_ref().unwrap().expected_callback_id.unwrap();
        let callback = zwave_serial::frame::DataFrame::new(
            zwave_serial::frame::FrameType::Request,
            FunctionType::SendData as u8,
            vec![callback_id, 0x00],
        );
        transport.push_inbound(&zwave_serial::frame::RawFrame::Data(callback).encode());
        d.step();
        assert!(d.in_flight.is_none());
        assert!(d.shared.nodes.lock().unwrap()[&NodeId::from(5u8)].is_alive());
    }

    #[test]
    fn sending_to_a_known_sleeping_node_defers_immediately() {
        let transport = MockTransport::new();
        let d = driver(transport);
        let node_id = NodeId::from(7u8);
        d.shared.nodes.lock().unwrap().insert(node_id, Node::new(node_id, NodeProtocolInfo::default()));

        let msg = Message::new(FunctionType::SendData, vec![]).for_node(node_id);
        d.send(QueueItem::new(msg, QueuePriority::Send));

        assert!(d.shared.send_queue.is_empty());
        assert_eq!(d.shared.wake_up.lock().unwrap().pending_count(node_id), 1);
    }

    #[test]
    fn max_priority_drops_to_controller_while_a_controller_command_is_active() {
        let transport = MockTransport::new();
        let d = driver(transport);
        d.shared.controller_commands.lock().unwrap().submit(crate::controller::ControllerCommand::new(
            crate::controller::ControllerCommandKind::AddDevice,
            None,
            0,
        ));
        assert_eq!(d.max_priority(), QueuePriority::Controller);
    }

    #[test]
    fn adding_a_node_advances_its_interview_to_protocol_info_and_sends_the_query() {
        let transport = MockTransport::new();
        let mut d = driver(transport);
        let node_id = NodeId::from(9u8);
        d.add_node(node_id, NodeProtocolInfo::default());

        assert_eq!(d.shared.nodes.lock().unwrap()[&node_id].interview.stage, QueryStage::ProtocolInfo);
        assert_eq!(d.shared.send_queue.len(QueuePriority::Query), 1);
    }

    #[test]
    fn a_completed_protocol_info_query_advances_to_probe_over_the_noop_queue() {
        let transport = MockTransport::new();
        let mut d = driver(transport);
        let node_id = NodeId::from(9u8);
        d.add_node(node_id, NodeProtocolInfo::default());
        d.shared.send_queue.pop(QueuePriority::Query);

        let msg = Message::new(FunctionType::GetNodeProtocolInfo, vec![node_id.as_u8()]).for_node(node_id);
        d.in_flight = Some(InFlight::start(QueueItem::new(msg, QueuePriority::Query), 3));

        let reply = zwave_serial::frame::DataFrame::new(
            zwave_serial::frame::FrameType::Response,
            FunctionType::GetNodeProtocolInfo as u8,
            vec![0x80, 0x01, 0x00, 0x04, 0x10, 0x01],
        );
        d.handle_frame(zwave_serial::frame::RawFrame::Data(reply));

        let node = &d.shared.nodes.lock().unwrap()[&node_id];
        assert_eq!(node.interview.stage, QueryStage::Probe);
        assert!(node.protocol_info.listening);
        assert_eq!(d.shared.send_queue.len(QueuePriority::NoOp), 1);
    }

    #[test]
    fn a_wake_up_notification_flushes_the_deferred_queue() {
        let transport = MockTransport::new();
        let d = driver(transport);
        let node_id = NodeId::from(7u8);
        d.shared.nodes.lock().unwrap().insert(node_id, Node::new(node_id, NodeProtocolInfo::default()));
        d.shared
            .wake_up
            .lock()
            .unwrap()
            .defer(node_id, QueueItem::new(Message::new(FunctionType::SendData, vec![]).for_node(node_id), QueuePriority::WakeUp));

        let mut d = d;
        let envelope = CCEnvelope::new(CommandClasses::WakeUp, wake_up::WakeUpCommand::Notification as u8, vec![]);
        d.dispatch_cc_envelope(node_id, envelope);

        assert_eq!(d.shared.wake_up.lock().unwrap().pending_count(node_id), 0);
        assert_eq!(d.shared.send_queue.len(QueuePriority::WakeUp), 2);
    }
}
