//! Backup writing API.
//!
//! [`BackupWriter`] runs the pack pipeline: the members are written into a
//! tar container in memory, the container is compressed, the result is
//! encrypted, and finally header, key envelope and payload are written out.
//!
//! # Example
//!
//! ```rust,no_run
//! use android_backup::member::MemberInfo;
//! use android_backup::write::{BackupWriter, PackEntry, WriteOptions};
//!
//! let writer = BackupWriter::new(WriteOptions::android_default());
//! let mut out = std::fs::File::create("new.ab")?;
//! let result = writer.write_data(
//!     &mut out,
//!     vec![PackEntry::from_bytes(MemberInfo::file("apps/pkg/f/hello.txt", 0), b"hi".to_vec())],
//!     None,
//! )?;
//! println!("wrote {} members", result.members_written);
//! # Ok::<(), android_backup::Error>(())
//! ```

mod options;

pub use options::{WriteOptions, WriteResult};

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path};
use std::sync::Arc;

use crate::codec::{DeflateOptions, deflate_all};
use crate::crypto::{
    CryptoProvider, EnvelopeSeed, Password, default_provider, ensure_available, seal,
};
use crate::error::ConfigError;
use crate::format::CompressionKind;
use crate::manifest::Manifest;
use crate::member::{MemberInfo, MemberKind, check_packable};
use crate::{Error, Result};

/// A member to pack together with its content.
pub struct PackEntry<'a> {
    /// Member metadata. For regular files `info.size` must match the data.
    pub info: MemberInfo,
    data: Box<dyn Read + 'a>,
}

impl std::fmt::Debug for PackEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackEntry")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl<'a> PackEntry<'a> {
    /// Creates an entry reading its content from `data`.
    ///
    /// For regular files `data` must yield exactly `info.size` bytes; packing
    /// fails with [`io::ErrorKind::InvalidInput`] otherwise.
    pub fn new(info: MemberInfo, data: impl Read + 'a) -> Self {
        Self {
            info,
            data: Box::new(data),
        }
    }
}

impl PackEntry<'static> {
    /// Creates an entry from in-memory content, setting `info.size`.
    pub fn from_bytes(mut info: MemberInfo, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        info.size = data.len() as u64;
        Self::new(info, io::Cursor::new(data))
    }

    /// Creates an entry without content (directories and links).
    pub fn empty(info: MemberInfo) -> Self {
        Self::new(info, io::empty())
    }
}

/// Writes Android backups.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    options: WriteOptions,
    provider: Arc<dyn CryptoProvider>,
}

impl BackupWriter {
    /// Creates a writer using the default crypto provider.
    pub fn new(options: WriteOptions) -> Self {
        Self::with_provider(options, default_provider())
    }

    /// Creates a writer using an explicit crypto provider.
    pub fn with_provider(options: WriteOptions, provider: Arc<dyn CryptoProvider>) -> Self {
        Self { options, provider }
    }

    /// Returns the write options.
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Writes a backup containing `members` to `sink`.
    ///
    /// Nothing is written to `sink` unless the whole payload could be built.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingMetadata`] if version, compression or
    ///   encryption is unset.
    /// - [`ConfigError::PasswordRequired`] if encryption is requested without
    ///   a password.
    /// - [`EnvironmentError::CryptoUnavailable`](crate::error::EnvironmentError)
    ///   if encryption is requested in a build without a crypto backend.
    pub fn write_data<'a, W, I>(
        &self,
        sink: &mut W,
        members: I,
        password: Option<&Password>,
    ) -> Result<WriteResult>
    where
        W: Write + ?Sized,
        I: IntoIterator<Item = PackEntry<'a>>,
    {
        self.write_impl(sink, members.into_iter().map(Ok), password, None)
    }

    /// Like [`write_data`](Self::write_data), wrapping the key with fixed
    /// material instead of fresh random values.
    ///
    /// The seed's round count overrides [`WriteOptions::rounds`]. The seed
    /// is ignored for unencrypted backups.
    pub fn write_data_with_seed<'a, W, I>(
        &self,
        sink: &mut W,
        members: I,
        password: Option<&Password>,
        seed: &EnvelopeSeed,
    ) -> Result<WriteResult>
    where
        W: Write + ?Sized,
        I: IntoIterator<Item = PackEntry<'a>>,
    {
        self.write_impl(sink, members.into_iter().map(Ok), password, Some(seed))
    }

    /// Packs the members listed in `manifest` from files below `source_dir`.
    ///
    /// Regular file sizes are taken from disk; other metadata comes from the
    /// manifest. Symlinks without a recorded target are read from disk.
    pub fn pack_dir<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        source_dir: impl AsRef<Path>,
        manifest: &Manifest,
        password: Option<&Password>,
    ) -> Result<WriteResult> {
        let dir = source_dir.as_ref();
        log::debug!(
            "packing {} members from {}",
            manifest.len(),
            dir.display()
        );
        let entries = manifest.members.iter().map(|member| open_member(dir, member));
        self.write_impl(sink, entries, password, None)
    }

    fn write_impl<'a, W, I>(
        &self,
        sink: &mut W,
        entries: I,
        password: Option<&Password>,
        seed: Option<&EnvelopeSeed>,
    ) -> Result<WriteResult>
    where
        W: Write + ?Sized,
        I: Iterator<Item = Result<PackEntry<'a>>>,
    {
        let header = self.options.header()?;
        let password = if header.is_encrypted() {
            let password = password.ok_or(ConfigError::PasswordRequired)?;
            ensure_available(self.provider.as_ref())?;
            Some(password)
        } else {
            None
        };

        let (container, members_written) = build_container(entries)?;
        let container_size = container.len() as u64;

        let compressed = match header.compression {
            CompressionKind::Zlib => {
                deflate_all(&container, &DeflateOptions::with_level(self.options.level))?
            }
            CompressionKind::None => container,
        };

        let mut prefix = Vec::new();
        let payload = match password {
            Some(password) => {
                let generated;
                let seed = match seed {
                    Some(seed) => seed,
                    None => {
                        generated = EnvelopeSeed::generate(self.provider.as_ref(), self.options.rounds)?;
                        &generated
                    }
                };
                let (envelope, ciphertext) =
                    seal(&compressed, password, seed, self.provider.as_ref())?;
                header.write(&mut prefix)?;
                envelope.write(&mut prefix)?;
                ciphertext
            }
            None => {
                header.write(&mut prefix)?;
                compressed
            }
        };

        sink.write_all(&prefix)?;
        sink.write_all(&payload)?;
        sink.flush()?;

        let result = WriteResult {
            members_written,
            container_size,
            payload_size: payload.len() as u64,
            total_size: (prefix.len() + payload.len()) as u64,
        };
        log::debug!(
            "wrote backup: {} members, {} container bytes, {} total bytes",
            result.members_written,
            result.container_size,
            result.total_size
        );
        Ok(result)
    }
}

/// Writes all entries into an in-memory tar container.
fn build_container<'a, I>(entries: I) -> Result<(Vec<u8>, usize)>
where
    I: Iterator<Item = Result<PackEntry<'a>>>,
{
    let mut builder = tar::Builder::new(Vec::new());
    let mut count = 0;

    for entry in entries {
        let PackEntry { info, data } = entry?;
        check_packable(&info)?;
        let mut header = info.to_header()?;
        match (&info.kind, &info.link_name) {
            (MemberKind::Symlink | MemberKind::HardLink, Some(target)) => {
                builder.append_link(&mut header, &info.name, target)?;
            }
            (MemberKind::File, _) => {
                let content = read_content(data, &info)?;
                builder.append_data(&mut header, &info.name, content.as_slice())?;
            }
            _ => {
                builder.append_data(&mut header, &info.name, io::empty())?;
            }
        }
        count += 1;
    }

    Ok((builder.into_inner()?, count))
}

/// Reads the content of a regular file member, which must be exactly
/// `info.size` bytes long.
fn read_content(data: Box<dyn Read + '_>, info: &MemberInfo) -> io::Result<Vec<u8>> {
    let mut content = Vec::new();
    data.take(info.size.saturating_add(1))
        .read_to_end(&mut content)?;
    let actual = content.len() as u64;
    if actual != info.size {
        let found = if actual > info.size {
            "more".to_string()
        } else {
            actual.to_string()
        };
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "member '{}' declares {} bytes but its content has {}",
                info.name, info.size, found
            ),
        ));
    }
    Ok(content)
}

/// Opens the on-disk content of a manifest member.
fn open_member(dir: &Path, member: &MemberInfo) -> Result<PackEntry<'static>> {
    let relative = Path::new(&member.name);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(Error::PathTraversal {
            path: member.name.clone(),
        });
    }

    let path = dir.join(relative);
    let mut info = member.clone();
    match info.kind {
        MemberKind::File => {
            let file = File::open(&path)?;
            info.size = file.metadata()?.len();
            Ok(PackEntry::new(info, BufReader::new(file)))
        }
        MemberKind::Symlink if info.link_name.is_none() => {
            let target = fs::read_link(&path)?;
            info.link_name = Some(target.to_string_lossy().into_owned());
            Ok(PackEntry::empty(info))
        }
        MemberKind::Other(flag) => {
            log::warn!(
                "member '{}' has unsupported type {:?}, packing it without content",
                info.name,
                flag as char
            );
            Ok(PackEntry::empty(info))
        }
        _ => Ok(PackEntry::empty(info)),
    }
}
