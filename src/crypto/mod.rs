//! Password-based encryption for Android backups.
//!
//! Encrypted backups protect the payload with AES-256-CBC under a random
//! master key. The master key travels in a *key envelope* next to the
//! header, itself encrypted under a key derived from the user's password:
//!
//! - PBKDF2-HMAC-SHA1 derives the user key from the password and user salt
//! - AES-256-CBC (no padding removal) unwraps the master key blob
//! - A second PBKDF2 run over the master key verifies the unwrap
//! - PKCS7 padding on the payload ciphertext
//!
//! # Master key checksum quirk
//!
//! The checksum derivation does not hash the raw master key bytes. Each byte
//! is first widened to a code point (with `0xFF00` added to bytes above
//! `0x7F`) and UTF-8 encoded; see [`utf8_compat`]. Archives written by
//! Android only verify when this transform is reproduced exactly.
//!
//! # Providers
//!
//! All primitives are reached through a [`CryptoProvider`]. Builds without
//! the `aes` feature get an [`UnavailableProvider`] whose every operation
//! fails with [`EnvironmentError::CryptoUnavailable`](crate::error::EnvironmentError).

mod envelope;
mod password;
mod provider;

use std::io;

use crate::error::IntegrityError;
use crate::streaming::ChunkTransform;
use crate::{Error, Result};

pub use envelope::{EnvelopeSeed, KeyEnvelope, MasterKeyMaterial, seal};
pub use password::Password;
#[cfg(feature = "aes")]
pub use provider::RustCryptoProvider;
pub use provider::{
    BlockTransform, CryptoProvider, UnavailableProvider, default_provider, ensure_available,
};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Salt length generated for new envelopes.
pub const SALT_SIZE: usize = 64;

/// PBKDF2 round count used when writing new backups.
pub const DEFAULT_ROUNDS: u32 = 10_000;

/// Upper bound on PBKDF2 rounds accepted from an archive by default.
///
/// Android itself writes 10,000 rounds; a hostile file could otherwise
/// demand an arbitrarily long key derivation.
pub const DEFAULT_MAX_ROUNDS: u32 = 10_000_000;

/// Appends PKCS7 padding: `16 - len % 16` bytes, a full block when aligned.
pub fn pkcs7_pad(data: &mut Vec<u8>) {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    data.extend(std::iter::repeat_n(pad_len as u8, pad_len));
}

/// Validates the padding of a decrypted terminal block.
///
/// Returns the number of data bytes preceding the padding.
///
/// # Errors
///
/// Returns [`IntegrityError::BadPadding`] if the pad length is outside
/// `1..=16` or the trailing bytes do not all equal it.
pub fn strip_padding(block: &[u8]) -> Result<usize> {
    let pad_len = *block.last().ok_or(IntegrityError::BadPadding)? as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > block.len() {
        return Err(IntegrityError::BadPadding.into());
    }
    let data_len = block.len() - pad_len;
    if block[data_len..].iter().any(|&b| b as usize != pad_len) {
        return Err(IntegrityError::BadPadding.into());
    }
    Ok(data_len)
}

/// Re-encodes raw key bytes the way the master key checksum expects.
///
/// Each byte becomes one code point: bytes up to `0x7F` are kept, bytes
/// `0x80..=0xFF` map to `U+FF80..=U+FFFF`. The result is UTF-8 encoded, so
/// high bytes expand to three bytes each.
pub fn utf8_compat(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 3);
    for &b in bytes {
        if b < 0x80 {
            out.push(b);
        } else {
            // U+FF80..=U+FFFF, always a three-byte sequence
            let cp = 0xFF00 | u32::from(b);
            out.push(0xE0 | (cp >> 12) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        }
    }
    out
}

/// Streaming AES-256-CBC payload decryptor.
///
/// Consumes block-aligned chunks and tracks the remaining ciphertext length
/// so the terminal block can be recognised and its padding removed. A
/// terminal block holding only padding produces empty output, which ends the
/// stream.
pub struct PayloadDecryptor {
    cipher: Box<dyn BlockTransform>,
    remaining: u64,
    done: bool,
}

impl std::fmt::Debug for PayloadDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadDecryptor")
            .field("remaining", &self.remaining)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl PayloadDecryptor {
    /// Creates a decryptor for `ciphertext_len` bytes of ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError::BadPadding`] if the ciphertext is empty or
    /// not a multiple of the block size; such a payload cannot carry valid
    /// padding.
    pub fn new(cipher: Box<dyn BlockTransform>, ciphertext_len: u64) -> Result<Self> {
        if ciphertext_len == 0 || ciphertext_len % BLOCK_SIZE as u64 != 0 {
            log::debug!("ciphertext length {} is not block aligned", ciphertext_len);
            return Err(IntegrityError::BadPadding.into());
        }
        Ok(Self {
            cipher,
            remaining: ciphertext_len,
            done: false,
        })
    }

    /// Returns the number of ciphertext bytes not yet decrypted.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl ChunkTransform for PayloadDecryptor {
    fn transform(&mut self, chunk: &[u8]) -> io::Result<Vec<u8>> {
        if self.done {
            return Ok(Vec::new());
        }
        if chunk.len() % BLOCK_SIZE != 0 || chunk.len() as u64 > self.remaining {
            return Err(Error::from(IntegrityError::BadPadding).into());
        }

        let mut out = chunk.to_vec();
        self.cipher.process_blocks(&mut out).map_err(io::Error::from)?;
        self.remaining -= chunk.len() as u64;

        if self.remaining == 0 {
            self.done = true;
            let data_len = strip_padding(&out[out.len() - BLOCK_SIZE..])
                .map_err(io::Error::from)?
                + (out.len() - BLOCK_SIZE);
            out.truncate(data_len);
        }
        Ok(out)
    }

    fn finish(&mut self) -> io::Result<Vec<u8>> {
        if self.done {
            Ok(Vec::new())
        } else {
            Err(Error::from(IntegrityError::BadPadding).into())
        }
    }
}

/// Decrypts and unpads a complete ciphertext in one call.
pub fn decrypt_payload(cipher: Box<dyn BlockTransform>, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut decryptor = PayloadDecryptor::new(cipher, ciphertext.len() as u64)?;
    decryptor.transform(ciphertext).map_err(Error::from_io)
}

/// Pads and encrypts a complete plaintext in one call.
pub fn encrypt_payload(mut cipher: Box<dyn BlockTransform>, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(plaintext.len() + BLOCK_SIZE);
    buf.extend_from_slice(plaintext);
    pkcs7_pad(&mut buf);
    cipher.process_blocks(&mut buf)?;
    Ok(buf)
}
