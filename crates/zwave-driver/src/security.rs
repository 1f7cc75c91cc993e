//! Security (S0) sub-protocol driver-side glue (spec.md §4.5): the two
//! round-trip nonce exchange that wraps an outgoing command for an
//! encrypted node, and the matching inbound side that answers a peer's
//! NonceGet and unwraps its CommandEncapsulation frames.
//!
//! Grounded on the teacher's `security::manager::SecurityManager` (per-node
//! nonce bookkeeping, `getrandom`-backed generation) reworked from its async
//! request/response futures into the plain state this crate's blocking
//! driver thread drives directly.

use std::collections::HashMap;

use zwave_core::error::{DriverError, SecurityError};
use zwave_core::ids::NodeId;
use zwave_core::security::{generate_nonce, NonceStore, NONCE_LEN};
use zwave_cc::envelope::CCEnvelope;
use zwave_cc::security::{self, NONCE_SIZE};

/// Nonces this driver generated and handed to a peer via NonceReport, kept
/// per node so nonce ids from different peers never collide in one store.
#[derive(Default)]
pub struct SecurityManager {
    encrypt_key: [u8; 16],
    auth_key: [u8; 16],
    own_nonces: HashMap<NodeId, NonceStore>,
    /// The most recent nonce a peer handed back via its own NonceReport,
    /// single-use and consumed by the next encrypted send to that peer.
    peer_nonces: HashMap<NodeId, [u8; NONCE_SIZE]>,
}

/// What a node needing an encrypted send should do next.
pub enum SecureSend {
    /// No cached nonce from the peer; send this NonceGet first and retry
    /// the original send once the NonceReport arrives.
    NeedNonce(CCEnvelope),
    /// A peer nonce was available; here is the encrypted payload, ready to
    /// be wrapped in a CommandEncapsulation envelope and sent.
    Ready(Vec<u8>),
}

impl SecurityManager {
    pub fn new(encrypt_key: [u8; 16], auth_key: [u8; 16]) -> Self {
        Self { encrypt_key, auth_key, own_nonces: HashMap::new(), peer_nonces: HashMap::new() }
    }

    /// A peer sent us NonceGet: generate and remember a nonce, returning the
    /// NonceReport envelope to send back.
    pub fn handle_nonce_get(&mut self, peer: NodeId) -> Result<CCEnvelope, SecurityError> {
        let nonce = generate_nonce()?;
        self.own_nonces.entry(peer).or_default().insert(nonce[0], nonce);
        Ok(security::nonce_report(nonce))
    }

    /// A peer answered our NonceGet: cache the nonce for the next encrypted
    /// send to them.
    pub fn handle_nonce_report(&mut self, peer: NodeId, nonce: [u8; NONCE_SIZE]) {
        self.peer_nonces.insert(peer, nonce);
    }

    /// Starts (or continues) sending `plaintext` encrypted to `peer`. If no
    /// peer nonce is cached yet, returns the NonceGet to issue first;
    /// otherwise consumes the cached nonce and returns the ciphertext.
    pub fn begin_secure_send(
        &mut self,
        our_node_id: NodeId,
        peer: NodeId,
        plaintext: &[u8],
    ) -> Result<SecureSend, SecurityError> {
        let Some(receiver_nonce) = self.peer_nonces.remove(&peer) else {
            return Ok(SecureSend::NeedNonce(security::nonce_get()));
        };
        let sender_nonce = generate_nonce()?;
        let payload = security::encrypt(
            plaintext,
            sender_nonce,
            receiver_nonce,
            our_node_id,
            peer,
            &self.encrypt_key,
            &self.auth_key,
        );
        Ok(SecureSend::Ready(payload))
    }

    /// Unwraps an inbound CommandEncapsulation payload from `peer`, looking
    /// up the receiver nonce we previously generated and handed out by the
    /// id embedded in the payload.
    pub fn decrypt_from(
        &mut self,
        our_node_id: NodeId,
        peer: NodeId,
        payload: &[u8],
    ) -> Result<Vec<u8>, DriverError> {
        if payload.len() < NONCE_LEN + 1 {
            return Err(SecurityError::DecryptionFailed.into());
        }
        let nonce_id = payload[payload.len() - 1 - zwave_cc::security::MAC_SIZE];
        let receiver_nonce = self
            .own_nonces
            .get_mut(&peer)
            .and_then(|store| store.take(nonce_id))
            .ok_or(SecurityError::DecryptionFailed)?;
        security::decrypt(payload, receiver_nonce, peer, our_node_id, &self.encrypt_key, &self.auth_key)
    }
}
