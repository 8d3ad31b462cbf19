//! RSA PKCS#1 v1.5 block framing.
//!
//! A PKCS#1 v1.5 block carries at most `k - 11` bytes of payload, where `k`
//! is the modulus length in bytes (245 bytes for RSA-2048). Longer
//! plaintexts are split into consecutive chunks of at most that size and
//! each chunk is encrypted on its own. The ciphertext is the plain
//! concatenation of `k`-byte blocks, with no header.
//!
//! ```text
//! plaintext:  [ chunk 0 (k-11) ][ chunk 1 (k-11) ][ chunk 2 (rest) ]
//! ciphertext: [ block 0 (k)    ][ block 1 (k)    ][ block 2 (k)    ]
//! ```
//!
//! Plaintexts that fit in one block produce exactly one block, identical to
//! a single `RSA/ECB/PKCS1Padding` operation.

use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

/// Bytes of padding PKCS#1 v1.5 adds to every block.
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Failures of the block cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The exported public key is neither SPKI nor PKCS#1 DER.
    #[error("malformed public key: {0}")]
    MalformedPublicKey(String),
    /// The ciphertext is empty or not a whole number of blocks.
    #[error("ciphertext length {len} is not a positive multiple of the {block_len}-byte block size")]
    InvalidLength {
        /// Length of the ciphertext.
        len: usize,
        /// Modulus length in bytes.
        block_len: usize,
    },
    /// The RSA primitive failed.
    #[error(transparent)]
    Rsa(#[from] rsa::Error),
}

/// Parses a DER public key in either X.509 `SubjectPublicKeyInfo` or
/// PKCS#1 `RSAPublicKey` form.
///
/// # Errors
///
/// Returns [`CipherError::MalformedPublicKey`] if neither encoding parses.
pub fn parse_public_key(der: &[u8]) -> Result<RsaPublicKey, CipherError> {
    RsaPublicKey::from_public_key_der(der).or_else(|spki_err| {
        RsaPublicKey::from_pkcs1_der(der).map_err(|pkcs1_err| {
            CipherError::MalformedPublicKey(format!(
                "not SPKI ({spki_err}) and not PKCS#1 ({pkcs1_err})"
            ))
        })
    })
}

/// Largest payload a single block can carry under `key`.
#[must_use]
pub fn max_block_payload(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(PKCS1_V15_OVERHEAD)
}

/// Encrypts `plaintext` with `key`, one PKCS#1 v1.5 block per chunk.
///
/// # Errors
///
/// Returns an error if the RSA primitive rejects a block.
pub fn encrypt_blocks(key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let chunk_len = max_block_payload(key).max(1);
    if plaintext.is_empty() {
        return Ok(key.encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)?);
    }

    let mut out = Vec::with_capacity(plaintext.len().div_ceil(chunk_len) * key.size());
    for chunk in plaintext.chunks(chunk_len) {
        out.extend_from_slice(&key.encrypt(&mut OsRng, Pkcs1v15Encrypt, chunk)?);
    }
    Ok(out)
}

/// Decrypts a concatenation of PKCS#1 v1.5 blocks with `key`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidLength`] if `ciphertext` is not a positive
/// multiple of the modulus length, or an RSA error if any block fails to
/// decrypt.
pub fn decrypt_blocks(key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let block_len = key.size();
    if ciphertext.is_empty() || ciphertext.len() % block_len != 0 {
        return Err(CipherError::InvalidLength {
            len: ciphertext.len(),
            block_len,
        });
    }

    let mut out = Vec::with_capacity(ciphertext.len());
    for block in ciphertext.chunks(block_len) {
        out.extend_from_slice(&key.decrypt(Pkcs1v15Encrypt, block)?);
    }
    Ok(out)
}
