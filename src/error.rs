//! Error types for Android backup operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when reading or writing Android backups, along with a
//! convenient [`Result<T>`] type alias.
//!
//! Errors fall into four families, each with its own detail enum:
//!
//! | Family | Detail type | Typical cause |
//! |--------|-------------|---------------|
//! | Format | [`FormatError`] | Malformed header, unknown enum token, broken envelope |
//! | Integrity | [`IntegrityError`] | Wrong password or corrupted archive |
//! | Config | [`ConfigError`] | Missing password or metadata before an operation |
//! | Environment | [`EnvironmentError`] | Cryptographic backend not compiled in |
//!
//! None of these are transient, so nothing in this crate retries.
//!
//! # Example
//!
//! ```rust,no_run
//! use android_backup::{AndroidBackup, Error, Password};
//!
//! fn count_members(path: &str, password: &str) -> android_backup::Result<usize> {
//!     let mut backup = AndroidBackup::open_path(path)?;
//!     match backup.members(Some(&Password::new(password))) {
//!         Ok(members) => Ok(members.len()),
//!         Err(e @ Error::Integrity(_)) => {
//!             eprintln!("Wrong password or corrupted archive");
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;

/// Malformed archive structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FormatError {
    /// The first line is not `ANDROID BACKUP`.
    #[error("missing \"ANDROID BACKUP\" magic line")]
    BadMagic,

    /// The version line is not a positive decimal integer.
    #[error("invalid version line {0:?}")]
    BadVersion(String),

    /// The compression line is not a known ordinal.
    #[error("unknown compression ordinal {0:?}")]
    UnknownCompression(String),

    /// The encryption line is not a known token.
    #[error("unknown encryption token {0:?}")]
    UnknownEncryption(String),

    /// A field of the key envelope could not be decoded.
    #[error("malformed key envelope field '{field}': {reason}")]
    MalformedEnvelope {
        /// The envelope field that failed to decode.
        field: &'static str,
        /// A description of the problem.
        reason: String,
    },
}

/// Failed integrity checks.
///
/// Both variants are what an incorrect password looks like; the format
/// offers no way to tell a wrong password apart from a damaged archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum IntegrityError {
    /// The master key checksum does not match.
    #[error("master key checksum mismatch (wrong password or corrupted archive)")]
    ChecksumMismatch,

    /// The terminal ciphertext block carries invalid padding.
    #[error("invalid padding in final ciphertext block (wrong password or corrupted archive)")]
    BadPadding,
}

/// Required inputs missing before an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The archive is (or is to be) encrypted but no password was supplied.
    #[error("password required for encrypted backup")]
    PasswordRequired,

    /// A header field was not set before writing.
    #[error("backup {0} is not set")]
    MissingMetadata(&'static str),
}

/// Missing runtime capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum EnvironmentError {
    /// No cryptographic backend is available in this build.
    #[error("cryptographic backend unavailable (build with the `aes` feature)")]
    CryptoUnavailable,
}

/// The main error type for Android backup operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading or writing.
    ///
    /// Errors reported by the tar container codec also arrive here.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive is not a well-formed Android backup.
    #[error("Invalid backup format: {0}")]
    Format(#[from] FormatError),

    /// An integrity check failed.
    #[error("Integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    /// The operation was not configured completely.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The runtime lacks a required capability.
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// A member path would escape the extraction directory.
    ///
    /// This is a **security error**; extraction stops at the offending member.
    #[error("Path traversal detected in member: {path}")]
    PathTraversal {
        /// The member path as stored in the archive.
        path: String,
    },

    /// A safety limit was exceeded (e.g. an absurd key derivation round count).
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// A member manifest could not be parsed or serialized.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] serde_json::Error),
}

impl Error {
    /// Recovers a crate error that travelled through an [`io::Error`].
    ///
    /// Pipeline stages run behind [`std::io::Read`], so their failures are
    /// boxed inside `io::Error`. The tar codec may wrap those again, which is
    /// why the whole source chain is searched.
    pub fn from_io(e: io::Error) -> Self {
        let mut source: Option<&(dyn std::error::Error + 'static)> =
            e.get_ref().map(|inner| inner as &(dyn std::error::Error + 'static));
        while let Some(err) = source {
            if let Some(found) = Error::recover(err) {
                return found;
            }
            // `io::Error::source` skips its own payload, so look at it here.
            let payload = err
                .downcast_ref::<io::Error>()
                .and_then(io::Error::get_ref)
                .and_then(|inner| Error::recover(inner));
            if let Some(found) = payload {
                return found;
            }
            source = err.source();
        }

        if !e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::Io(e);
        }
        match e.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(err)) => *err,
            Some(Err(other)) => Error::Io(io::Error::other(other)),
            None => Error::Io(io::Error::other("empty I/O error")),
        }
    }

    /// Matches one link of an error chain against the crate's error types.
    fn recover(err: &(dyn std::error::Error + 'static)) -> Option<Self> {
        if let Some(found) = err.downcast_ref::<Error>().and_then(Error::clone_kind) {
            return Some(found);
        }
        if let Some(e) = err.downcast_ref::<IntegrityError>() {
            return Some(Error::Integrity(*e));
        }
        if let Some(e) = err.downcast_ref::<FormatError>() {
            return Some(Error::Format(e.clone()));
        }
        if let Some(e) = err.downcast_ref::<ConfigError>() {
            return Some(Error::Config(e.clone()));
        }
        err.downcast_ref::<EnvironmentError>()
            .map(|e| Error::Environment(*e))
    }

    /// Clones the variants that carry only plain data.
    fn clone_kind(&self) -> Option<Self> {
        match self {
            Error::Format(e) => Some(Error::Format(e.clone())),
            Error::Integrity(e) => Some(Error::Integrity(*e)),
            Error::Config(e) => Some(Error::Config(e.clone())),
            Error::Environment(e) => Some(Error::Environment(*e)),
            Error::PathTraversal { path } => Some(Error::PathTraversal { path: path.clone() }),
            Error::ResourceLimitExceeded(msg) => Some(Error::ResourceLimitExceeded(msg.clone())),
            _ => None,
        }
    }

    /// Returns `true` for format errors.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Format(_))
    }

    /// Returns `true` for integrity errors (wrong password or corruption).
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Error::Integrity(_))
    }

    /// Returns `true` for configuration errors.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Returns `true` if this error might be recoverable.
    ///
    /// Only a missing or wrong password can be fixed by trying again with
    /// different input, plus transient I/O errors.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Integrity(_) => true,
            Error::Config(ConfigError::PasswordRequired) => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::Format(_) | Error::Integrity(_) => io::Error::new(io::ErrorKind::InvalidData, err),
            other => io::Error::other(other),
        }
    }
}

/// A specialized Result type for Android backup operations.
pub type Result<T> = std::result::Result<T, Error>;
