//! Android backup format constants and low-level parsing utilities.
//!
//! An Android backup starts with four newline-terminated text lines:
//!
//! ```text
//! ANDROID BACKUP
//! <version>
//! <compression ordinal>
//! <encryption token>
//! ```
//!
//! Encrypted backups follow the header with five more lines describing the
//! key envelope (see [`crate::crypto`]); the payload starts right after.

pub mod header;
pub mod reader;

pub use header::{BackupHeader, CompressionKind, EncryptionKind};

/// The magic first line of every Android backup, including its newline.
pub const MAGIC: &[u8] = b"ANDROID BACKUP\n";

/// Backup version written by current Android releases.
pub const DEFAULT_VERSION: u32 = 3;

/// Upper bound on a header line, newline included.
pub const MAX_HEADER_LINE: usize = 64;

/// Upper bound on a key envelope line, newline included.
///
/// Salts are arbitrary length on the wire; Android writes 64-byte salts
/// (128 hex digits).
pub const MAX_ENVELOPE_LINE: usize = 16 * 1024;
