//! Backup reading API.
//!
//! [`AndroidBackup`] parses the header of a backup and composes the unpack
//! pipeline on demand: the payload is decrypted (when encrypted), inflated
//! (when compressed) and handed to the tar reader.
//!
//! # Example
//!
//! ```rust,no_run
//! use android_backup::{AndroidBackup, Password};
//!
//! let mut backup = AndroidBackup::open_path("backup.ab")?;
//! let password = Password::new("secret");
//!
//! for member in backup.members(Some(&password))? {
//!     println!("{}: {} bytes", member.name, member.size);
//! }
//!
//! let manifest = backup.extract_all("backup.ab_unpacked", Some(&password))?;
//! manifest.save("backup.ab.manifest.json")?;
//! # Ok::<(), android_backup::Error>(())
//! ```
//!
//! # Streaming and buffered modes
//!
//! In [`ReadMode::Streaming`] the payload reader is forward-only, so
//! [`AndroidBackup::extract_all`] reads the payload twice: once to record the
//! member list and once to extract. [`ReadMode::Buffered`] decodes the payload
//! into memory once and rewinds between the passes.

mod info;
mod options;
mod payload;

pub use info::{BackupInfo, EncryptionInfo};
pub use options::{ReadMode, ReadOptions};
pub use payload::PayloadReader;

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::codec::{InflateTransform, inflate_all};
use crate::crypto::{
    BLOCK_SIZE, BlockTransform, CryptoProvider, KeyEnvelope, Password, PayloadDecryptor,
    decrypt_payload, default_provider, ensure_available,
};
use crate::error::ConfigError;
use crate::format::{BackupHeader, CompressionKind, EncryptionKind};
use crate::manifest::Manifest;
use crate::member::{MemberInfo, read_members};
use crate::streaming::{ChunkTransform, Passthrough, TransformReader};
use crate::{Error, Result};

use payload::Stage;

/// An Android backup opened for reading.
pub struct AndroidBackup<R> {
    source: R,
    header: BackupHeader,
    payload_start: u64,
    options: ReadOptions,
    provider: Arc<dyn CryptoProvider>,
}

impl<R> std::fmt::Debug for AndroidBackup<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AndroidBackup")
            .field("header", &self.header)
            .field("payload_start", &self.payload_start)
            .field("options", &self.options)
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl AndroidBackup<BufReader<File>> {
    /// Opens a backup file with default options.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_path_with(path, ReadOptions::default())
    }

    /// Opens a backup file with the given options.
    pub fn open_path_with(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::open_with(BufReader::new(file), options, default_provider())
    }
}

impl<R: Read + Seek> AndroidBackup<R> {
    /// Opens a backup whose header starts at the current position of `source`.
    pub fn open(source: R) -> Result<Self> {
        Self::open_with(source, ReadOptions::default(), default_provider())
    }

    /// Opens a backup with explicit options and crypto provider.
    pub fn open_with(
        mut source: R,
        options: ReadOptions,
        provider: Arc<dyn CryptoProvider>,
    ) -> Result<Self> {
        let start = source.stream_position()?;
        let (header, consumed) = BackupHeader::read(&mut source)?;
        Ok(Self {
            source,
            header,
            payload_start: start + consumed,
            options,
            provider,
        })
    }

    /// Returns the parsed header.
    pub fn header(&self) -> &BackupHeader {
        &self.header
    }

    /// Returns the format version.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Returns the payload compression.
    pub fn compression(&self) -> CompressionKind {
        self.header.compression
    }

    /// Returns the payload encryption.
    pub fn encryption(&self) -> EncryptionKind {
        self.header.encryption
    }

    /// Returns `true` if the payload is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.header.is_encrypted()
    }

    /// Returns the offset immediately after the header.
    pub fn payload_start(&self) -> u64 {
        self.payload_start
    }

    /// Returns the read options.
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Consumes the backup and returns the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Reads the key envelope of an encrypted backup.
    ///
    /// Needs no password. Returns `None` for unencrypted backups.
    pub fn key_envelope(&mut self) -> Result<Option<KeyEnvelope>> {
        Ok(self.read_envelope()?.map(|(envelope, _)| envelope))
    }

    /// Collects header and envelope information.
    pub fn info(&mut self) -> Result<BackupInfo> {
        let total_size = self.source.seek(SeekFrom::End(0))?;
        let envelope = self.read_envelope()?;
        let data_offset = self.payload_start + envelope.as_ref().map_or(0, |(_, len)| *len);
        Ok(BackupInfo {
            version: self.header.version,
            compression: self.header.compression,
            encryption: self.header.encryption,
            payload_offset: self.payload_start,
            data_offset,
            total_size,
            encryption_info: envelope.as_ref().map(|(e, _)| EncryptionInfo::from(e)),
        })
    }

    fn read_envelope(&mut self) -> Result<Option<(KeyEnvelope, u64)>> {
        if !self.is_encrypted() {
            return Ok(None);
        }
        self.source.seek(SeekFrom::Start(self.payload_start))?;
        KeyEnvelope::read(&mut self.source).map(Some)
    }

    /// Opens the plaintext tar stream.
    ///
    /// Every call restarts from the payload start. The returned reader
    /// borrows the backup, so only one consumer can be active at a time.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::PasswordRequired`] if the backup is encrypted and no
    ///   password is given.
    /// - [`Error::Integrity`] for a wrong password or corrupted payload. In
    ///   streaming mode padding errors surface from the reader at the end of
    ///   the stream, wrapped in [`std::io::Error`]; use [`Error::from_io`].
    pub fn read_data(&mut self, password: Option<&Password>) -> Result<PayloadReader<'_>> {
        let password = match (self.is_encrypted(), password) {
            (true, None) => return Err(ConfigError::PasswordRequired.into()),
            (true, Some(password)) => Some(password),
            (false, _) => None,
        };

        let end = self.source.seek(SeekFrom::End(0))?;
        let mut data_start = self.payload_start;
        self.source.seek(SeekFrom::Start(data_start))?;

        let mut cipher: Option<Box<dyn BlockTransform>> = None;
        if let Some(password) = password {
            ensure_available(self.provider.as_ref())?;
            let (envelope, consumed) = KeyEnvelope::read(&mut self.source)?;
            envelope.check_rounds(self.options.max_kdf_rounds)?;
            let master = envelope.unwrap(password, self.provider.as_ref())?;
            cipher = Some(self.provider.cbc_decryptor(master.key(), &master.iv)?);
            data_start += consumed;
        }

        let data_len = end.saturating_sub(data_start);
        let compressed = self.header.compression.is_compressed();
        let options = self.options.clone();
        log::debug!(
            "reading {} payload bytes at offset {} ({:?} mode)",
            data_len,
            data_start,
            options.mode
        );

        let raw = (&mut self.source).take(data_len);
        match options.mode {
            ReadMode::Streaming => {
                let raw: Box<dyn Read + '_> = Box::new(raw);
                let plain: Box<dyn Read + '_> = match cipher {
                    Some(cipher) => {
                        let decryptor = PayloadDecryptor::new(cipher, data_len)?;
                        let chunk = options.decrypt_chunk_size.max(1).div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
                        Box::new(TransformReader::with_chunk_size(raw, decryptor, chunk))
                    }
                    None => raw,
                };
                let transform: Box<dyn ChunkTransform> = if compressed {
                    Box::new(InflateTransform::new())
                } else {
                    Box::new(Passthrough)
                };
                let stage: Stage<'_> =
                    TransformReader::with_chunk_size(plain, transform, options.inflate_chunk_size);
                Ok(PayloadReader::Streaming(stage))
            }
            ReadMode::Buffered => {
                let mut raw = raw;
                let mut data = Vec::with_capacity(data_len as usize);
                raw.read_to_end(&mut data)?;
                if let Some(cipher) = cipher {
                    data = decrypt_payload(cipher, &data)?;
                }
                if compressed {
                    data = inflate_all(&data)?;
                }
                Ok(PayloadReader::Buffered(std::io::Cursor::new(data)))
            }
        }
    }

    /// Lists the members of the tar container.
    ///
    /// The payload is read to its end, so a bad terminal padding block or a
    /// truncated zlib stream fails here in both read modes.
    pub fn members(&mut self, password: Option<&Password>) -> Result<Vec<MemberInfo>> {
        let mut payload = self.read_data(password)?;
        let members = read_members(&mut payload)?;
        drain(&mut payload)?;
        log::debug!("listed {} members", members.len());
        Ok(members)
    }

    /// Extracts every member below `target`.
    ///
    /// Returns the member manifest in container order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathTraversal`] for a member whose path would escape
    /// `target`; members before it remain extracted.
    pub fn extract_all(
        &mut self,
        target: impl AsRef<Path>,
        password: Option<&Password>,
    ) -> Result<Manifest> {
        let target = target.as_ref();
        fs::create_dir_all(target)?;
        let preserve_permissions = self.options.preserve_permissions;
        let preserve_mtime = self.options.preserve_mtime;

        let mut payload = self.read_data(password)?;
        let members = read_members(&mut payload)?;
        drain(&mut payload)?;

        if payload.is_seekable() {
            payload.rewind()?;
            unpack_into(&mut payload, target, preserve_permissions, preserve_mtime)?;
        } else {
            drop(payload);
            log::debug!("restarting payload stream for extraction pass");
            let mut payload = self.read_data(password)?;
            unpack_into(&mut payload, target, preserve_permissions, preserve_mtime)?;
            drain(&mut payload)?;
        }

        log::debug!("extracted {} members to {}", members.len(), target.display());
        Ok(Manifest::from_members(members))
    }
}

/// Reads `payload` to its end, running the end-of-stream checks of each stage.
fn drain<S: Read>(mut payload: S) -> Result<u64> {
    io::copy(&mut payload, &mut io::sink()).map_err(Error::from_io)
}

/// Unpacks a tar stream below `target`.
fn unpack_into<S: Read>(
    source: S,
    target: &Path,
    preserve_permissions: bool,
    preserve_mtime: bool,
) -> Result<()> {
    let mut archive = tar::Archive::new(source);
    archive.set_preserve_permissions(preserve_permissions);
    archive.set_preserve_mtime(preserve_mtime);
    archive.set_overwrite(true);

    for entry in archive.entries().map_err(Error::from_io)? {
        let mut entry = entry.map_err(Error::from_io)?;
        let name = entry
            .path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !entry.unpack_in(target).map_err(Error::from_io)? {
            log::warn!("refusing to extract '{}' outside {}", name, target.display());
            return Err(Error::PathTraversal { path: name });
        }
    }
    Ok(())
}
