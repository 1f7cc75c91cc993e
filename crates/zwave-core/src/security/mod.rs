pub mod crypto;
pub mod nonce;

pub use crypto::{derive_s0_keys, S0Keys, TEMPORARY_INCLUSION_KEY};
pub use nonce::{generate_nonce, Nonce, NonceStore, NONCE_LEN, NONCE_TTL};
