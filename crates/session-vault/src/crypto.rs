//! PIN-keyed sealing for the simulated vault.
//!
//! Blob layout: `salt(16) || nonce(12) || ciphertext+tag`. The key is
//! HKDF-SHA256 derived from the PIN with the random salt; a wrong PIN
//! surfaces as an AEAD open failure.

use crate::{VaultError, VaultResult};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

/// Salt size prepended to the blob.
pub const SALT_SIZE: usize = 16;
/// Nonce size for ChaCha20-Poly1305 (96 bits).
pub const NONCE_SIZE: usize = 12;
/// Derived key size (256 bits).
pub const KEY_SIZE: usize = 32;

const HKDF_INFO: &[u8] = b"tea-taster.sim-vault.v1";

fn derive_key(pin: &str, salt: &[u8]) -> [u8; KEY_SIZE] {
    let hk = Hkdf::<Sha256>::new(Some(salt), pin.as_bytes());
    let mut key = [0u8; KEY_SIZE];
    // expand cannot fail for a 32-byte output
    hk.expand(HKDF_INFO, &mut key)
        .expect("HKDF expand with valid length");
    key
}

/// Seal plaintext under a PIN-derived key with fresh random salt and nonce.
pub fn seal(pin: &str, plaintext: &[u8]) -> VaultResult<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let key = derive_key(pin, &salt);
    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open a sealed blob with the PIN. Fails with [`VaultError::Crypto`] when
/// the PIN is wrong or the blob was tampered with.
pub fn open(pin: &str, blob: &[u8]) -> VaultResult<Vec<u8>> {
    if blob.len() < SALT_SIZE + NONCE_SIZE {
        return Err(VaultError::Crypto("sealed blob too short".to_string()));
    }
    let (salt, rest) = blob.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let key = derive_key(pin, salt);
    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| VaultError::Crypto(e.to_string()))
}
