//! Tar member descriptors.
//!
//! The payload of a backup is a tar stream; the crate delegates the
//! container format to the `tar` crate and only mirrors the header fields
//! needed to list members and to rebuild an archive.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// The kind of a tar member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Hard link to an earlier member.
    HardLink,
    /// Any other tar entry type, by its type flag byte.
    Other(u8),
}

impl MemberKind {
    /// Maps a tar entry type.
    pub fn from_entry_type(entry_type: tar::EntryType) -> Self {
        match entry_type {
            tar::EntryType::Regular | tar::EntryType::Continuous => MemberKind::File,
            tar::EntryType::Directory => MemberKind::Directory,
            tar::EntryType::Symlink => MemberKind::Symlink,
            tar::EntryType::Link => MemberKind::HardLink,
            other => MemberKind::Other(other.as_byte()),
        }
    }

    /// Returns the tar entry type.
    pub fn entry_type(self) -> tar::EntryType {
        match self {
            MemberKind::File => tar::EntryType::Regular,
            MemberKind::Directory => tar::EntryType::Directory,
            MemberKind::Symlink => tar::EntryType::Symlink,
            MemberKind::HardLink => tar::EntryType::Link,
            MemberKind::Other(byte) => tar::EntryType::new(byte),
        }
    }

    /// Single-character code used in listings.
    pub fn code(self) -> char {
        match self {
            MemberKind::File => '-',
            MemberKind::Directory => 'd',
            MemberKind::Symlink => 'l',
            MemberKind::HardLink => 'h',
            MemberKind::Other(_) => '?',
        }
    }
}

fn default_mode() -> u32 {
    0o644
}

/// Metadata of one member of the tar container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Member path inside the archive, without a trailing slash.
    pub name: String,
    /// Content size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Permission bits.
    #[serde(default = "default_mode")]
    pub mode: u32,
    /// Member kind.
    pub kind: MemberKind,
    /// Owner user id.
    #[serde(default)]
    pub uid: u64,
    /// Owner group id.
    #[serde(default)]
    pub gid: u64,
    /// Owner user name.
    #[serde(default)]
    pub uname: String,
    /// Owner group name.
    #[serde(default)]
    pub gname: String,
    /// Modification time, seconds since the Unix epoch.
    #[serde(default)]
    pub mtime: u64,
    /// Link target for symlinks and hard links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_name: Option<String>,
}

impl MemberInfo {
    /// Creates a regular file member with default ownership.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mode: default_mode(),
            kind: MemberKind::File,
            uid: 0,
            gid: 0,
            uname: String::new(),
            gname: String::new(),
            mtime: 0,
            link_name: None,
        }
    }

    /// Creates a directory member with default ownership.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            mode: 0o755,
            kind: MemberKind::Directory,
            ..Self::file(name, 0)
        }
    }

    /// Creates a symlink member.
    pub fn symlink(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            mode: 0o777,
            kind: MemberKind::Symlink,
            link_name: Some(target.into()),
            ..Self::file(name, 0)
        }
    }

    /// Mirrors the header of a tar entry.
    pub fn from_entry<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Self> {
        let header = entry.header();
        let path = entry.path()?;
        let name = path.to_string_lossy().trim_end_matches('/').to_string();
        let link_name = entry
            .link_name()?
            .map(|target| target.to_string_lossy().into_owned());

        Ok(Self {
            name,
            size: entry.size(),
            mode: header.mode()?,
            kind: MemberKind::from_entry_type(header.entry_type()),
            uid: header.uid()?,
            gid: header.gid()?,
            uname: lossy_field(header.username_bytes()),
            gname: lossy_field(header.groupname_bytes()),
            mtime: header.mtime()?,
            link_name,
        })
    }

    /// Describes a file on disk under the archive path `name`.
    ///
    /// Symlinks are not followed.
    pub fn from_path(name: impl Into<String>, path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let file_type = metadata.file_type();
        let name = name.into();

        let mut info = if file_type.is_symlink() {
            let target = fs::read_link(path)?;
            Self::symlink(name, target.to_string_lossy())
        } else if file_type.is_dir() {
            Self::directory(name)
        } else {
            Self::file(name, metadata.len())
        };

        info.mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            info.mode = metadata.mode() & 0o7777;
            info.uid = u64::from(metadata.uid());
            info.gid = u64::from(metadata.gid());
        }

        Ok(info)
    }

    /// Builds a ustar header for this member.
    ///
    /// The path is set when the member is appended, so long names can use
    /// the GNU extension.
    pub fn to_header(&self) -> Result<tar::Header> {
        let mut header = tar::Header::new_ustar();
        header.set_entry_type(self.kind.entry_type());
        header.set_size(if self.kind == MemberKind::File {
            self.size
        } else {
            0
        });
        header.set_mode(self.mode);
        header.set_uid(self.uid);
        header.set_gid(self.gid);
        header.set_mtime(self.mtime);
        if !self.uname.is_empty() {
            header.set_username(&self.uname)?;
        }
        if !self.gname.is_empty() {
            header.set_groupname(&self.gname)?;
        }
        Ok(header)
    }

    /// Returns `true` for regular files.
    pub fn is_file(&self) -> bool {
        self.kind == MemberKind::File
    }

    /// Returns `true` for directories.
    pub fn is_dir(&self) -> bool {
        self.kind == MemberKind::Directory
    }

    /// Renders a `tar -tv` style line.
    pub fn listing_line(&self) -> String {
        let mut line = format!(
            "{}{} {}/{} {:>10} {}",
            self.kind.code(),
            mode_string(self.mode),
            owner(&self.uname, self.uid),
            owner(&self.gname, self.gid),
            self.size,
            self.name
        );
        if let Some(target) = &self.link_name {
            let arrow = if self.kind == MemberKind::HardLink {
                " link to "
            } else {
                " -> "
            };
            line.push_str(arrow);
            line.push_str(target);
        }
        line
    }
}

fn lossy_field(bytes: Option<&[u8]>) -> String {
    bytes
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

fn owner(name: &str, id: u64) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

fn mode_string(mode: u32) -> String {
    const FLAGS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    FLAGS
        .iter()
        .map(|&(bit, c)| if mode & bit != 0 { c } else { '-' })
        .collect()
}

/// Reads all member descriptors from a tar stream.
pub(crate) fn read_members<R: Read>(source: R) -> Result<Vec<MemberInfo>> {
    let mut archive = tar::Archive::new(source);
    let mut members = Vec::new();
    for entry in archive.entries().map_err(crate::Error::from_io)? {
        let entry = entry.map_err(crate::Error::from_io)?;
        members.push(MemberInfo::from_entry(&entry)?);
    }
    Ok(members)
}

/// Fails with [`io::ErrorKind::InvalidInput`] if `info` cannot be packed.
pub(crate) fn check_packable(info: &MemberInfo) -> io::Result<()> {
    if info.name.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "member name is empty",
        ));
    }
    if matches!(info.kind, MemberKind::Symlink | MemberKind::HardLink) && info.link_name.is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("link member '{}' has no target", info.name),
        ));
    }
    Ok(())
}
