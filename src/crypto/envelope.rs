//! The password-wrapped master key envelope.
//!
//! On disk the envelope is five newline-terminated lines between the header
//! and the payload ciphertext:
//!
//! ```text
//! <user salt, hex>
//! <master key checksum salt, hex>
//! <PBKDF2 rounds, decimal>
//! <user IV, hex>
//! <encrypted master key blob, hex>
//! ```
//!
//! The blob decrypts to three length-prefixed fields: master IV, master key
//! and master key checksum.

use std::io::{Read, Write};

use zeroize::Zeroizing;

use crate::error::{FormatError, IntegrityError};
use crate::format::MAX_ENVELOPE_LINE;
use crate::format::reader::{Line, lossy, read_line, trimmed};
use crate::{Error, Result};

use super::{
    BLOCK_SIZE, CryptoProvider, DEFAULT_ROUNDS, KEY_SIZE, Password, SALT_SIZE, encrypt_payload,
    ensure_available, pkcs7_pad, utf8_compat,
};

const FIELD_USER_SALT: &str = "user salt";
const FIELD_CHECKSUM_SALT: &str = "checksum salt";
const FIELD_ROUNDS: &str = "rounds";
const FIELD_USER_IV: &str = "user iv";
const FIELD_BLOB: &str = "master key blob";

fn malformed(field: &'static str, reason: impl Into<String>) -> Error {
    FormatError::MalformedEnvelope {
        field,
        reason: reason.into(),
    }
    .into()
}

/// Public key-wrapping parameters of an encrypted backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEnvelope {
    /// Salt for deriving the user key from the password.
    pub user_salt: Vec<u8>,
    /// Salt for the master key checksum.
    pub checksum_salt: Vec<u8>,
    /// PBKDF2 round count, shared by both derivations.
    pub rounds: u32,
    /// IV for decrypting the master key blob.
    pub iv: [u8; BLOCK_SIZE],
    /// The encrypted master key blob.
    pub encrypted_master_blob: Vec<u8>,
}

impl KeyEnvelope {
    /// Parses the five envelope lines.
    ///
    /// Returns the envelope and the number of bytes consumed.
    pub fn read<R: Read + ?Sized>(r: &mut R) -> Result<(Self, u64)> {
        let mut consumed = 0u64;

        let line = envelope_line(r, FIELD_USER_SALT, &mut consumed)?;
        let user_salt = decode_hex(FIELD_USER_SALT, &line)?;

        let line = envelope_line(r, FIELD_CHECKSUM_SALT, &mut consumed)?;
        let checksum_salt = decode_hex(FIELD_CHECKSUM_SALT, &line)?;

        let line = envelope_line(r, FIELD_ROUNDS, &mut consumed)?;
        let rounds = std::str::from_utf8(trimmed(&line))
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .ok_or_else(|| malformed(FIELD_ROUNDS, format!("invalid round count {:?}", lossy(&line))))?;

        let line = envelope_line(r, FIELD_USER_IV, &mut consumed)?;
        let iv_bytes = decode_hex(FIELD_USER_IV, &line)?;
        let iv: [u8; BLOCK_SIZE] = iv_bytes.as_slice().try_into().map_err(|_| {
            malformed(
                FIELD_USER_IV,
                format!("expected {} bytes, found {}", BLOCK_SIZE, iv_bytes.len()),
            )
        })?;

        let line = envelope_line(r, FIELD_BLOB, &mut consumed)?;
        let encrypted_master_blob = decode_hex(FIELD_BLOB, &line)?;

        Ok((
            Self {
                user_salt,
                checksum_salt,
                rounds,
                iv,
                encrypted_master_blob,
            },
            consumed,
        ))
    }

    /// Writes the five envelope lines, hex in upper case.
    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "{}", hex::encode_upper(&self.user_salt))?;
        writeln!(w, "{}", hex::encode_upper(&self.checksum_salt))?;
        writeln!(w, "{}", self.rounds)?;
        writeln!(w, "{}", hex::encode_upper(self.iv))?;
        writeln!(w, "{}", hex::encode_upper(&self.encrypted_master_blob))?;
        Ok(())
    }

    /// Rejects round counts above `max`.
    pub fn check_rounds(&self, max: u32) -> Result<()> {
        if self.rounds > max {
            log::warn!(
                "key derivation rounds {} exceed maximum {}, rejecting",
                self.rounds,
                max
            );
            return Err(Error::ResourceLimitExceeded(format!(
                "key derivation rounds {} exceed maximum {}",
                self.rounds, max
            )));
        }
        Ok(())
    }

    /// Unwraps and verifies the master key.
    ///
    /// # Errors
    ///
    /// - [`IntegrityError::ChecksumMismatch`] for a wrong password or a
    ///   corrupted envelope (the two cannot be told apart).
    /// - [`FormatError::MalformedEnvelope`] if the blob is not block aligned,
    ///   or the verified key material has the wrong sizes.
    /// - [`EnvironmentError::CryptoUnavailable`](crate::error::EnvironmentError)
    ///   if the provider is absent.
    pub fn unwrap(
        &self,
        password: &Password,
        provider: &dyn CryptoProvider,
    ) -> Result<MasterKeyMaterial> {
        ensure_available(provider)?;

        let blob_len = self.encrypted_master_blob.len();
        if blob_len == 0 || blob_len % BLOCK_SIZE != 0 {
            return Err(malformed(
                FIELD_BLOB,
                format!("{} bytes is not a whole number of cipher blocks", blob_len),
            ));
        }

        let user_key =
            Zeroizing::new(provider.derive_key(password.as_bytes(), &self.user_salt, self.rounds)?);
        let mut blob = Zeroizing::new(self.encrypted_master_blob.clone());
        provider
            .cbc_decryptor(&user_key, &self.iv)?
            .process_blocks(&mut blob)?;

        let mut offset = 0;
        let (master_iv, master_key, checksum) = match (
            length_prefixed(&blob, &mut offset),
            length_prefixed(&blob, &mut offset),
            length_prefixed(&blob, &mut offset),
        ) {
            (Some(iv), Some(key), Some(ck)) => (iv, key, ck),
            _ => {
                log::debug!("master key blob fields overrun the blob");
                return Err(IntegrityError::ChecksumMismatch.into());
            }
        };

        let expected =
            provider.derive_key(&utf8_compat(master_key), &self.checksum_salt, self.rounds)?;
        if checksum != expected {
            return Err(IntegrityError::ChecksumMismatch.into());
        }

        let iv: [u8; BLOCK_SIZE] = master_iv.try_into().map_err(|_| {
            malformed(
                FIELD_BLOB,
                format!("master IV is {} bytes, expected {}", master_iv.len(), BLOCK_SIZE),
            )
        })?;
        let key: [u8; KEY_SIZE] = master_key.try_into().map_err(|_| {
            malformed(
                FIELD_BLOB,
                format!("master key is {} bytes, expected {}", master_key.len(), KEY_SIZE),
            )
        })?;

        log::debug!("unwrapped master key ({} PBKDF2 rounds)", self.rounds);
        Ok(MasterKeyMaterial {
            iv,
            key: Zeroizing::new(key),
            checksum: checksum.to_vec(),
        })
    }
}

/// Reads one envelope line, counting consumed bytes.
fn envelope_line<R: Read + ?Sized>(
    r: &mut R,
    field: &'static str,
    consumed: &mut u64,
) -> Result<Vec<u8>> {
    match read_line(r, MAX_ENVELOPE_LINE)? {
        Line::Complete(line) => {
            *consumed += line.len() as u64;
            Ok(line)
        }
        Line::Eof(_) => Err(malformed(field, "truncated")),
        Line::TooLong => Err(malformed(field, "line too long")),
    }
}

fn decode_hex(field: &'static str, line: &[u8]) -> Result<Vec<u8>> {
    hex::decode(trimmed(line)).map_err(|e| malformed(field, e.to_string()))
}

/// Reads a one-byte length followed by that many bytes.
fn length_prefixed<'a>(blob: &'a [u8], offset: &mut usize) -> Option<&'a [u8]> {
    let len = *blob.get(*offset)? as usize;
    let start = *offset + 1;
    let field = blob.get(start..start + len)?;
    *offset = start + len;
    Some(field)
}

/// The unwrapped payload key.
pub struct MasterKeyMaterial {
    /// Payload IV.
    pub iv: [u8; BLOCK_SIZE],
    key: Zeroizing<[u8; KEY_SIZE]>,
    /// The checksum stored next to the key.
    pub checksum: Vec<u8>,
}

impl MasterKeyMaterial {
    /// Returns the payload key.
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKeyMaterial").finish_non_exhaustive()
    }
}

/// Random inputs of the key-wrapping step.
///
/// [`EnvelopeSeed::generate`] draws everything from the provider's secure
/// random source. [`EnvelopeSeed::explicit`] takes fixed values, which makes
/// the output reproducible.
#[derive(Clone)]
pub struct EnvelopeSeed {
    master_key: Zeroizing<[u8; KEY_SIZE]>,
    /// Salt for the master key checksum.
    pub master_salt: Vec<u8>,
    /// Salt for the user key.
    pub user_salt: Vec<u8>,
    /// Payload IV.
    pub master_iv: [u8; BLOCK_SIZE],
    /// IV for the master key blob.
    pub user_iv: [u8; BLOCK_SIZE],
    /// PBKDF2 round count.
    pub rounds: u32,
}

impl EnvelopeSeed {
    /// Generates fresh key material.
    ///
    /// Draws, in order: master key, master salt, user salt, master IV, user IV.
    pub fn generate(provider: &dyn CryptoProvider, rounds: u32) -> Result<Self> {
        ensure_available(provider)?;
        let mut master_key = Zeroizing::new([0u8; KEY_SIZE]);
        provider.fill_random(&mut master_key[..])?;
        let mut master_salt = vec![0u8; SALT_SIZE];
        provider.fill_random(&mut master_salt)?;
        let mut user_salt = vec![0u8; SALT_SIZE];
        provider.fill_random(&mut user_salt)?;
        let mut master_iv = [0u8; BLOCK_SIZE];
        provider.fill_random(&mut master_iv)?;
        let mut user_iv = [0u8; BLOCK_SIZE];
        provider.fill_random(&mut user_iv)?;

        Ok(Self {
            master_key,
            master_salt,
            user_salt,
            master_iv,
            user_iv,
            rounds,
        })
    }

    /// Uses explicit key material.
    pub fn explicit(
        master_key: [u8; KEY_SIZE],
        master_salt: Vec<u8>,
        user_salt: Vec<u8>,
        master_iv: [u8; BLOCK_SIZE],
        user_iv: [u8; BLOCK_SIZE],
        rounds: u32,
    ) -> Self {
        Self {
            master_key: Zeroizing::new(master_key),
            master_salt,
            user_salt,
            master_iv,
            user_iv,
            rounds,
        }
    }

    /// Returns the payload key.
    pub fn master_key(&self) -> &[u8; KEY_SIZE] {
        &self.master_key
    }
}

impl Default for EnvelopeSeed {
    /// All-zero material with [`DEFAULT_ROUNDS`]; only useful as a template.
    fn default() -> Self {
        Self::explicit(
            [0u8; KEY_SIZE],
            vec![0u8; SALT_SIZE],
            vec![0u8; SALT_SIZE],
            [0u8; BLOCK_SIZE],
            [0u8; BLOCK_SIZE],
            DEFAULT_ROUNDS,
        )
    }
}

impl std::fmt::Debug for EnvelopeSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeSeed")
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}

/// Encrypts `plaintext` under the seed's master key and wraps that key.
///
/// Returns the envelope to write after the header and the payload
/// ciphertext that follows it.
pub fn seal(
    plaintext: &[u8],
    password: &Password,
    seed: &EnvelopeSeed,
    provider: &dyn CryptoProvider,
) -> Result<(KeyEnvelope, Vec<u8>)> {
    ensure_available(provider)?;
    if seed.rounds == 0 {
        return Err(malformed(FIELD_ROUNDS, "round count must be positive"));
    }

    let ciphertext = encrypt_payload(
        provider.cbc_encryptor(&seed.master_key, &seed.master_iv)?,
        plaintext,
    )?;

    let checksum = provider.derive_key(
        &utf8_compat(&seed.master_key[..]),
        &seed.master_salt,
        seed.rounds,
    )?;
    let user_key =
        Zeroizing::new(provider.derive_key(password.as_bytes(), &seed.user_salt, seed.rounds)?);

    let mut blob = Zeroizing::new(Vec::with_capacity(3 + BLOCK_SIZE + 2 * KEY_SIZE + BLOCK_SIZE));
    blob.push(BLOCK_SIZE as u8);
    blob.extend_from_slice(&seed.master_iv);
    blob.push(KEY_SIZE as u8);
    blob.extend_from_slice(&seed.master_key[..]);
    blob.push(checksum.len() as u8);
    blob.extend_from_slice(&checksum);
    pkcs7_pad(&mut blob);
    provider
        .cbc_encryptor(&user_key, &seed.user_iv)?
        .process_blocks(&mut blob)?;

    let envelope = KeyEnvelope {
        user_salt: seed.user_salt.clone(),
        checksum_salt: seed.master_salt.clone(),
        rounds: seed.rounds,
        iv: seed.user_iv,
        encrypted_master_blob: blob.to_vec(),
    };
    Ok((envelope, ciphertext))
}
