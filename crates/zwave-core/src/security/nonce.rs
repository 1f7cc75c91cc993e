//! Per-node nonce bookkeeping for Security CC (S0).
//!
//! Grounded on spec.md §4.5/§9: a per-node fixed-size LRU of generated
//! nonces, each with a short TTL, evicted silently on lookup when expired.

use std::time::{Duration, Instant};

use crate::error::SecurityError;

pub const NONCE_LEN: usize = 8;
pub const NONCE_TTL: Duration = Duration::from_secs(10);
const NONCE_STORE_SIZE: usize = 8;

/// Draws a fresh random nonce from the OS CSPRNG (spec.md §4.5). The first
/// byte doubles as the nonce id exchanged on the wire.
pub fn generate_nonce() -> Result<[u8; NONCE_LEN], SecurityError> {
    let mut bytes = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut bytes).map_err(|_| SecurityError::NonceGenerationFailed)?;
    Ok(bytes)
}

#[derive(Debug, Clone, Copy)]
pub struct Nonce {
    pub id: u8,
    pub bytes: [u8; NONCE_LEN],
    generated_at: Instant,
}

impl Nonce {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.generated_at) > NONCE_TTL
    }
}

/// FIFO store of nonces this node has generated and handed out, so a later
/// `MessageEncap` referencing a receiver-nonce-id can be matched back to the
/// bytes that were sent.
#[derive(Debug, Default)]
pub struct NonceStore {
    entries: Vec<Nonce>,
}

impl NonceStore {
    pub fn new() -> Self {
        Self { entries: Vec::with_capacity(NONCE_STORE_SIZE) }
    }

    pub fn insert(&mut self, id: u8, bytes: [u8; NONCE_LEN]) {
        if self.entries.len() >= NONCE_STORE_SIZE {
            self.entries.remove(0);
        }
        self.entries.push(Nonce { id, bytes, generated_at: Instant::now() });
    }

    /// Looks up and removes (nonces are single-use) the nonce with the given
    /// id. Silently drops any expired entries encountered along the way.
    pub fn take(&mut self, id: u8) -> Option<[u8; NONCE_LEN]> {
        let now = Instant::now();
        self.entries.retain(|n| !n.is_expired(now));
        if let Some(pos) = self.entries.iter().position(|n| n.id == id) {
            Some(self.entries.remove(pos).bytes)
        } else {
            None
        }
    }
}
