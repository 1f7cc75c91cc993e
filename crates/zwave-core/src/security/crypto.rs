//! Security CC (S0) cryptographic primitives: AES-ECB key derivation,
//! AES-OFB encryption and the CBC-MAC-derived 8-byte authentication tag.
//!
//! Grounded on the teacher's `zwave-core::security::crypto` module, trimmed
//! to the S0 primitives this driver needs (S2's CCM/ECDH machinery is out of
//! scope here).

use aes::cipher::{
    block_padding::ZeroPadding,
    generic_array::{typenum::U16, GenericArray},
    BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher,
};

type Aes128Ofb = ofb::Ofb<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

pub fn encrypt_aes_ecb(plaintext: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    let cipher = aes::Aes128::new(key.into());

    let mut block: GenericArray<u8, U16> = (*plaintext).into();
    cipher.encrypt_block(&mut block);

    block.into()
}

pub fn encrypt_aes_ofb(plaintext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    let mut cipher = <Aes128Ofb as KeyIvInit>::new(key.into(), iv.into());
    let mut buf = plaintext.to_vec();
    cipher.apply_keystream(&mut buf);
    buf
}

/// AES-OFB is a symmetric stream cipher; decryption is the same operation as
/// encryption.
pub fn decrypt_aes_ofb(ciphertext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    encrypt_aes_ofb(ciphertext, key, iv)
}

/// Computes the 8-byte Security CC (S0) message authentication code: the
/// first half of the last CBC-MAC block, using a zero IV.
pub fn compute_mac(plaintext: &[u8], key: &[u8; 16]) -> [u8; 8] {
    compute_mac_iv(plaintext, key, &[0u8; 16])
}

pub fn compute_mac_iv(plaintext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> [u8; 8] {
    let cipher = Aes128CbcEnc::new(key.into(), iv.into());
    let buf = cipher.encrypt_padded_vec_mut::<ZeroPadding>(plaintext);
    let mut mac = [0u8; 8];
    mac.copy_from_slice(&buf[buf.len() - 16..][..8]);
    mac
}

/// The S0 network key derives two working keys by AES-ECB-encrypting two
/// fixed all-same-byte blocks: 0xAA for encryption, 0x55 for authentication.
const ENCRYPT_KEY_CONSTANT: [u8; 16] = [0xaa; 16];
const AUTH_KEY_CONSTANT: [u8; 16] = [0x55; 16];

/// The temporary key used while a node is mid-inclusion, before the real
/// network key has been transferred to it.
pub const TEMPORARY_INCLUSION_KEY: [u8; 16] = [0u8; 16];

pub struct S0Keys {
    pub encrypt_key: [u8; 16],
    pub auth_key: [u8; 16],
}

pub fn derive_s0_keys(network_key: &[u8; 16]) -> S0Keys {
    S0Keys {
        encrypt_key: encrypt_aes_ecb(&ENCRYPT_KEY_CONSTANT, network_key),
        auth_key: encrypt_aes_ecb(&AUTH_KEY_CONSTANT, network_key),
    }
}
