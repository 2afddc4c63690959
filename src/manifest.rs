//! Ordered member manifests.
//!
//! Unpacking records the member order and metadata of the tar container in a
//! JSON manifest; packing replays it so a repacked backup lists its members
//! in the original order with the original ownership.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::member::MemberInfo;
use crate::{Error, Result};

/// Name Android gives the per-package manifest member.
const PACKAGE_MANIFEST: &str = "_manifest";

/// An ordered list of members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Members in container order.
    pub members: Vec<MemberInfo>,
}

impl Manifest {
    /// Creates a manifest from members in container order.
    pub fn from_members(members: Vec<MemberInfo>) -> Self {
        Self { members }
    }

    /// Returns the member names in order.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if there are no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the total content size of regular files.
    pub fn total_size(&self) -> u64 {
        self.members
            .iter()
            .filter(|m| m.is_file())
            .map(|m| m.size)
            .sum()
    }

    /// Parses a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Writes the manifest file, replacing any existing one.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        fs::write(path, json)?;
        Ok(())
    }

    /// Builds a manifest from the files under `dir`.
    ///
    /// Used when a directory is packed without a recorded manifest. Only
    /// regular files and symlinks are listed; siblings are sorted by name
    /// with `_manifest` first, which is where Android expects it.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        log::debug!("scanning {} for members", dir.display());

        let walker = WalkDir::new(dir)
            .follow_links(false)
            .min_depth(1)
            .sort_by(|a, b| {
                let a_first = a.file_name() == PACKAGE_MANIFEST;
                let b_first = b.file_name() == PACKAGE_MANIFEST;
                b_first
                    .cmp(&a_first)
                    .then_with(|| a.file_name().cmp(b.file_name()))
            });

        let mut members = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            let file_type = entry.file_type();
            if !(file_type.is_file() || file_type.is_symlink()) {
                continue;
            }
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            members.push(MemberInfo::from_path(name, entry.path())?);
        }
        Ok(Self { members })
    }
}

impl IntoIterator for Manifest {
    type Item = MemberInfo;
    type IntoIter = std::vec::IntoIter<MemberInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}
