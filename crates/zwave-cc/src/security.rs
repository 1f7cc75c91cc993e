//! Security CC (0x98), S0 scheme: nonce exchange and encrypted command
//! encapsulation (spec.md §4.5). Grounded on the teacher's
//! `commandclass::security` (the `S0AuthData` MAC input layout, the
//! sender-nonce‖receiver-nonce OFB IV, zero-IV CBC-MAC over the auth data)
//! trimmed to un-sequenced encapsulation — this driver doesn't split
//! messages across frames.

use crate::envelope::CCEnvelope;
use derive_try_from_primitive::TryFromPrimitive;
use zwave_core::command_classes::CommandClasses;
use zwave_core::error::{DriverError, SecurityError};
use zwave_core::ids::NodeId;
use zwave_core::security::crypto::{compute_mac, decrypt_aes_ofb, encrypt_aes_ofb};

pub const NONCE_SIZE: usize = 8;
pub const MAC_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum SecurityCommand {
    CommandsSupportedGet = 0x02,
    CommandsSupportedReport = 0x03,
    SchemeGet = 0x04,
    SchemeReport = 0x05,
    NetworkKeySet = 0x06,
    NetworkKeyVerify = 0x07,
    SchemeInherit = 0x08,
    NonceGet = 0x40,
    NonceReport = 0x80,
    CommandEncapsulation = 0x81,
    CommandEncapsulationNonceGet = 0xc1,
}

pub fn nonce_get() -> CCEnvelope {
    CCEnvelope::new(CommandClasses::Security, SecurityCommand::NonceGet as u8, vec![])
}

pub fn nonce_report(nonce: [u8; NONCE_SIZE]) -> CCEnvelope {
    CCEnvelope::new(CommandClasses::Security, SecurityCommand::NonceReport as u8, nonce.to_vec())
}

/// Authentication input per spec.md §4.5: sender nonce, receiver nonce, the
/// command byte being authenticated, both node ids, and the ciphertext.
fn auth_data(
    sender_nonce: &[u8; NONCE_SIZE],
    receiver_nonce: &[u8; NONCE_SIZE],
    sending_node_id: NodeId,
    receiving_node_id: NodeId,
    ciphertext: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 8 + 1 + 1 + 1 + 1 + ciphertext.len());
    buf.extend_from_slice(sender_nonce);
    buf.extend_from_slice(receiver_nonce);
    buf.push(SecurityCommand::CommandEncapsulation as u8);
    buf.push(u8::from(sending_node_id));
    buf.push(u8::from(receiving_node_id));
    buf.push(ciphertext.len() as u8);
    buf.extend_from_slice(ciphertext);
    buf
}

/// Encrypts `plaintext` (the inner CC envelope's bytes) for transmission to
/// `receiving_node_id`, returning the full CommandEncapsulation payload.
pub fn encrypt(
    plaintext: &[u8],
    sender_nonce: [u8; NONCE_SIZE],
    receiver_nonce: [u8; NONCE_SIZE],
    sending_node_id: NodeId,
    receiving_node_id: NodeId,
    encrypt_key: &[u8; 16],
    auth_key: &[u8; 16],
) -> Vec<u8> {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&sender_nonce);
    iv[8..].copy_from_slice(&receiver_nonce);
    let ciphertext = encrypt_aes_ofb(plaintext, encrypt_key, &iv);

    let auth = auth_data(&sender_nonce, &receiver_nonce, sending_node_id, receiving_node_id, &ciphertext);
    let mac = compute_mac(&auth, auth_key);

    let mut payload = Vec::with_capacity(8 + ciphertext.len() + 1 + 8);
    payload.extend_from_slice(&sender_nonce);
    payload.extend_from_slice(&ciphertext);
    payload.push(receiver_nonce[0]); // nonce id: first byte of the receiver's own nonce
    payload.extend_from_slice(&mac);
    payload
}

/// Decrypts and authenticates an inbound CommandEncapsulation payload,
/// given the matching generated nonce looked up by its id (last byte of the
/// payload's nonce-id field).
pub fn decrypt(
    payload: &[u8],
    receiver_nonce: [u8; NONCE_SIZE],
    sending_node_id: NodeId,
    receiving_node_id: NodeId,
    encrypt_key: &[u8; 16],
    auth_key: &[u8; 16],
) -> Result<Vec<u8>, DriverError> {
    if payload.len() < NONCE_SIZE + 1 + MAC_SIZE {
        return Err(SecurityError::DecryptionFailed.into());
    }
    let sender_nonce: [u8; NONCE_SIZE] = payload[..NONCE_SIZE].try_into().unwrap();
    let ciphertext = &payload[NONCE_SIZE..payload.len() - 1 - MAC_SIZE];
    let received_mac: [u8; MAC_SIZE] = payload[payload.len() - MAC_SIZE..].try_into().unwrap();

    let auth = auth_data(&sender_nonce, &receiver_nonce, sending_node_id, receiving_node_id, ciphertext);
    let expected_mac = compute_mac(&auth, auth_key);
    if expected_mac != received_mac {
        return Err(SecurityError::DecryptionFailed.into());
    }

    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&sender_nonce);
    iv[8..].copy_from_slice(&receiver_nonce);
    Ok(decrypt_aes_ofb(ciphertext, encrypt_key, &iv))
}

#[cfg(test)]
mod test {
    use super::*;

    fn keys() -> ([u8; 16], [u8; 16]) {
        ([0x11; 16], [0x22; 16])
    }

    #[test]
    fn encrypt_then_decrypt_round_trips_the_plaintext() {
        let (encrypt_key, auth_key) = keys();
        let sender_nonce = [1u8; NONCE_SIZE];
        let receiver_nonce = [2u8; NONCE_SIZE];
        let plaintext = vec![0x62, 0x01, 0xff]; // DoorLock::Set(locked)

        let payload = encrypt(
            &plaintext,
            sender_nonce,
            receiver_nonce,
            NodeId::from(1u8),
            NodeId::from(9u8),
            &encrypt_key,
            &auth_key,
        );

        let decrypted = decrypt(
            &payload,
            receiver_nonce,
            NodeId::from(1u8),
            NodeId::from(9u8),
            &encrypt_key,
            &auth_key,
        )
        .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let (encrypt_key, auth_key) = keys();
        let sender_nonce = [1u8; NONCE_SIZE];
        let receiver_nonce = [2u8; NONCE_SIZE];
        let mut payload = encrypt(
            &[0x20, 0x01, 0xff],
            sender_nonce,
            receiver_nonce,
            NodeId::from(1u8),
            NodeId::from(9u8),
            &encrypt_key,
            &auth_key,
        );
        let last_ciphertext_byte = payload.len() - MAC_SIZE - 1 - 1;
        payload[last_ciphertext_byte] ^= 0xff;

        let result = decrypt(
            &payload,
            receiver_nonce,
            NodeId::from(1u8),
            NodeId::from(9u8),
            &encrypt_key,
            &auth_key,
        );
        assert!(result.is_err());
    }
}
