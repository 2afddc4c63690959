//! Android backup header structures and parsing.

use std::fmt;
use std::io::{Read, Write};

use serde::Serialize;

use crate::error::FormatError;
use crate::{Error, Result};

use super::reader::{Line, lossy, read_line, trimmed};
use super::{MAGIC, MAX_HEADER_LINE};

/// Payload compression declared on line 3 of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompressionKind {
    /// Payload is stored as-is.
    None,
    /// Payload is a zlib (DEFLATE) stream.
    Zlib,
}

impl CompressionKind {
    /// Wire ordinal table.
    const ORDINALS: [(u32, CompressionKind); 2] =
        [(0, CompressionKind::None), (1, CompressionKind::Zlib)];

    /// Returns the decimal ordinal written to the header.
    pub fn ordinal(self) -> u32 {
        match self {
            CompressionKind::None => 0,
            CompressionKind::Zlib => 1,
        }
    }

    /// Looks up a kind by its wire ordinal.
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        Self::ORDINALS
            .iter()
            .find(|(value, _)| *value == ordinal)
            .map(|(_, kind)| *kind)
    }

    /// Returns `true` if the payload is compressed.
    pub fn is_compressed(self) -> bool {
        self != CompressionKind::None
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionKind::None => write!(f, "none"),
            CompressionKind::Zlib => write!(f, "zlib"),
        }
    }
}

/// Payload encryption declared on line 4 of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EncryptionKind {
    /// Payload is not encrypted.
    None,
    /// Payload is AES-256-CBC encrypted under a password-wrapped master key.
    Aes256,
}

impl EncryptionKind {
    /// Wire token table.
    const TOKENS: [(&'static str, EncryptionKind); 2] =
        [("none", EncryptionKind::None), ("AES-256", EncryptionKind::Aes256)];

    /// Returns the token written to the header.
    pub fn token(self) -> &'static str {
        match self {
            EncryptionKind::None => "none",
            EncryptionKind::Aes256 => "AES-256",
        }
    }

    /// Looks up a kind by its exact wire token.
    pub fn from_token(token: &[u8]) -> Option<Self> {
        Self::TOKENS
            .iter()
            .find(|(value, _)| value.as_bytes() == token)
            .map(|(_, kind)| *kind)
    }

    /// Returns `true` if the payload is encrypted.
    pub fn is_encrypted(self) -> bool {
        self != EncryptionKind::None
    }
}

impl fmt::Display for EncryptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The text header at the start of an Android backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackupHeader {
    /// Backup format version (positive).
    pub version: u32,
    /// Payload compression.
    pub compression: CompressionKind,
    /// Payload encryption.
    pub encryption: EncryptionKind,
}

impl BackupHeader {
    /// Creates a header from its three fields.
    pub fn new(version: u32, compression: CompressionKind, encryption: EncryptionKind) -> Self {
        Self {
            version,
            compression,
            encryption,
        }
    }

    /// Parses the four header lines.
    ///
    /// Returns the header and the number of bytes consumed, which is the
    /// payload offset when the reader started at the beginning of the file.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] for a wrong magic line, a version that is
    /// not a positive integer, or an unknown compression/encryption value.
    /// I/O errors are passed through.
    pub fn read<R: Read + ?Sized>(r: &mut R) -> Result<(Self, u64)> {
        let mut consumed = 0u64;

        let magic = match read_line(r, MAX_HEADER_LINE)? {
            Line::Complete(line) => line,
            _ => return Err(FormatError::BadMagic.into()),
        };
        if magic != MAGIC {
            return Err(FormatError::BadMagic.into());
        }
        consumed += magic.len() as u64;

        let line = header_line(r, FormatError::BadVersion)?;
        consumed += line.len() as u64;
        let version = parse_decimal(&line)
            .filter(|v| *v > 0)
            .ok_or_else(|| FormatError::BadVersion(lossy(&line)))?;

        let line = header_line(r, FormatError::UnknownCompression)?;
        consumed += line.len() as u64;
        let compression = parse_decimal(&line)
            .and_then(CompressionKind::from_ordinal)
            .ok_or_else(|| FormatError::UnknownCompression(lossy(&line)))?;

        let line = header_line(r, FormatError::UnknownEncryption)?;
        consumed += line.len() as u64;
        let encryption = EncryptionKind::from_token(trimmed(&line))
            .ok_or_else(|| FormatError::UnknownEncryption(lossy(&line)))?;

        let header = Self::new(version, compression, encryption);
        log::debug!(
            "parsed backup header: version {}, compression {}, encryption {}",
            header.version,
            header.compression,
            header.encryption
        );
        Ok((header, consumed))
    }

    /// Writes the four header lines.
    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        w.write_all(MAGIC)?;
        writeln!(w, "{}", self.version)?;
        writeln!(w, "{}", self.compression.ordinal())?;
        writeln!(w, "{}", self.encryption.token())?;
        Ok(())
    }

    /// Returns the serialized header bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32);
        // writing into a Vec cannot fail
        let _ = self.write(&mut out);
        out
    }

    /// Returns `true` if the payload is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_encrypted()
    }
}

impl fmt::Display for BackupHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Compression: {}", self.compression)?;
        write!(f, "Encryption: {}", self.encryption)
    }
}

/// Reads a complete header line, mapping truncation to the field's error.
fn header_line<R: Read + ?Sized>(
    r: &mut R,
    field_error: fn(String) -> FormatError,
) -> Result<Vec<u8>> {
    match read_line(r, MAX_HEADER_LINE)? {
        Line::Complete(line) => Ok(line),
        Line::Eof(partial) => Err(Error::Format(field_error(lossy(&partial)))),
        Line::TooLong => Err(Error::Format(field_error("<line too long>".into()))),
    }
}

fn parse_decimal(line: &[u8]) -> Option<u32> {
    let digits = trimmed(line);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}
