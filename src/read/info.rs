//! Backup information types.

use serde::Serialize;

use crate::crypto::KeyEnvelope;
use crate::format::{CompressionKind, EncryptionKind};

/// Public key-derivation parameters, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptionInfo {
    /// PBKDF2-HMAC-SHA1 round count.
    pub rounds: u32,
    /// User salt length in bytes.
    pub user_salt_size: usize,
    /// Master key checksum salt length in bytes.
    pub checksum_salt_size: usize,
    /// Encrypted master key blob length in bytes.
    pub master_blob_size: usize,
}

impl From<&KeyEnvelope> for EncryptionInfo {
    fn from(envelope: &KeyEnvelope) -> Self {
        Self {
            rounds: envelope.rounds,
            user_salt_size: envelope.user_salt.len(),
            checksum_salt_size: envelope.checksum_salt.len(),
            master_blob_size: envelope.encrypted_master_blob.len(),
        }
    }
}

/// Information about an opened backup, available without a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    /// Format version.
    pub version: u32,
    /// Payload compression.
    pub compression: CompressionKind,
    /// Payload encryption.
    pub encryption: EncryptionKind,
    /// Offset of the first byte after the header.
    pub payload_offset: u64,
    /// Offset of the first payload data byte (after the key envelope).
    pub data_offset: u64,
    /// Total size of the backup in bytes.
    pub total_size: u64,
    /// Key-derivation parameters for encrypted backups.
    pub encryption_info: Option<EncryptionInfo>,
}

impl BackupInfo {
    /// Returns the size of the encoded payload data.
    pub fn data_size(&self) -> u64 {
        self.total_size.saturating_sub(self.data_offset)
    }
}
