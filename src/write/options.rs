//! Write options and results for backup creation.

use crate::crypto::DEFAULT_ROUNDS;
use crate::error::ConfigError;
use crate::format::{BackupHeader, CompressionKind, DEFAULT_VERSION, EncryptionKind};
use crate::Result;

/// Options for creating a backup.
///
/// Version, compression and encryption have no implicit defaults; writing
/// fails with [`ConfigError::MissingMetadata`] until all three are set.
/// [`WriteOptions::android_default`] sets them the way Android does.
///
/// # Example
///
/// ```rust
/// use android_backup::format::{CompressionKind, EncryptionKind};
/// use android_backup::write::WriteOptions;
///
/// let options = WriteOptions::new()
///     .version(3)
///     .compression(CompressionKind::Zlib)
///     .encryption(EncryptionKind::Aes256)
///     .level(9);
/// assert_eq!(options.level, 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Format version written to the header.
    pub version: Option<u32>,
    /// Payload compression.
    pub compression: Option<CompressionKind>,
    /// Payload encryption.
    pub encryption: Option<EncryptionKind>,
    /// zlib level (0-9, default 6).
    pub level: u32,
    /// PBKDF2 rounds for new envelopes (default 10000).
    pub rounds: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version: None,
            compression: None,
            encryption: None,
            level: 6,
            rounds: DEFAULT_ROUNDS,
        }
    }
}

impl WriteOptions {
    /// Creates options with no header fields set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Version 3, zlib, unencrypted.
    pub fn android_default() -> Self {
        Self::new()
            .version(DEFAULT_VERSION)
            .compression(CompressionKind::Zlib)
            .encryption(EncryptionKind::None)
    }

    /// Sets the format version.
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the payload compression.
    pub fn compression(mut self, compression: CompressionKind) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Sets the payload encryption.
    pub fn encryption(mut self, encryption: EncryptionKind) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Sets the zlib level, clamped to 0-9.
    pub fn level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Sets the PBKDF2 round count (at least 1).
    pub fn rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds.max(1);
        self
    }

    /// Builds the header, failing on the first unset field.
    pub fn header(&self) -> Result<BackupHeader> {
        let version = self.version.ok_or(ConfigError::MissingMetadata("version"))?;
        let compression = self
            .compression
            .ok_or(ConfigError::MissingMetadata("compression"))?;
        let encryption = self
            .encryption
            .ok_or(ConfigError::MissingMetadata("encryption"))?;
        Ok(BackupHeader::new(version, compression, encryption))
    }
}

/// Result of writing a backup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Number of members written.
    pub members_written: usize,
    /// Size of the tar container.
    pub container_size: u64,
    /// Size of the payload after compression and encryption.
    pub payload_size: u64,
    /// Total bytes written, header and envelope included.
    pub total_size: u64,
}

impl WriteResult {
    /// Returns the compression ratio (payload / container).
    pub fn compression_ratio(&self) -> f64 {
        if self.container_size == 0 {
            1.0
        } else {
            self.payload_size as f64 / self.container_size as f64
        }
    }

    /// Returns the space savings percentage.
    pub fn space_savings(&self) -> f64 {
        if self.container_size == 0 {
            0.0
        } else {
            1.0 - self.compression_ratio()
        }
    }
}
