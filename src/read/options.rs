//! Options for reading and extracting backups.

use crate::crypto::{BLOCK_SIZE, DEFAULT_MAX_ROUNDS};
use crate::streaming::DEFAULT_CHUNK_SIZE;

/// How the payload is materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Decrypt and inflate incrementally; the payload reader is forward-only.
    #[default]
    Streaming,
    /// Decrypt and inflate everything up front; the payload reader seeks freely.
    Buffered,
}

/// Options for [`AndroidBackup`](super::AndroidBackup).
///
/// # Example
///
/// ```rust
/// use android_backup::read::{ReadMode, ReadOptions};
///
/// let options = ReadOptions::new()
///     .mode(ReadMode::Buffered)
///     .max_kdf_rounds(100_000)
///     .preserve_permissions(false);
/// assert_eq!(options.mode, ReadMode::Buffered);
/// ```
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Payload materialisation mode. Default: streaming.
    pub mode: ReadMode,

    /// Ciphertext bytes pulled per decryption step.
    ///
    /// Always a multiple of the cipher block size. Default: one block.
    pub decrypt_chunk_size: usize,

    /// Compressed bytes pulled per inflate step. Default: 4096.
    pub inflate_chunk_size: usize,

    /// Highest PBKDF2 round count accepted from an archive.
    ///
    /// Default: 10,000,000.
    pub max_kdf_rounds: u32,

    /// Apply stored permission bits when extracting. Default: true.
    pub preserve_permissions: bool,

    /// Apply stored modification times when extracting. Default: true.
    pub preserve_mtime: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            mode: ReadMode::Streaming,
            decrypt_chunk_size: BLOCK_SIZE,
            inflate_chunk_size: DEFAULT_CHUNK_SIZE,
            max_kdf_rounds: DEFAULT_MAX_ROUNDS,
            preserve_permissions: true,
            preserve_mtime: true,
        }
    }
}

impl ReadOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read mode.
    pub fn mode(mut self, mode: ReadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for [`ReadMode::Buffered`].
    pub fn buffered(self) -> Self {
        self.mode(ReadMode::Buffered)
    }

    /// Sets the decryption chunk size, rounded up to a whole number of blocks.
    pub fn decrypt_chunk_size(mut self, size: usize) -> Self {
        self.decrypt_chunk_size = size.max(1).div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        self
    }

    /// Sets the inflate chunk size.
    pub fn inflate_chunk_size(mut self, size: usize) -> Self {
        self.inflate_chunk_size = size.max(1);
        self
    }

    /// Sets the maximum accepted PBKDF2 round count.
    pub fn max_kdf_rounds(mut self, rounds: u32) -> Self {
        self.max_kdf_rounds = rounds;
        self
    }

    /// Sets whether permission bits are restored.
    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    /// Sets whether modification times are restored.
    pub fn preserve_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }
}
