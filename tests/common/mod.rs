//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use android_backup::member::MemberInfo;
use android_backup::{
    AndroidBackup, BackupWriter, CompressionKind, EncryptionKind, PackEntry, Password,
    WriteOptions, WriteResult,
};

/// Password of the captured encrypted fixture.
pub const FIXTURE_PASSWORD: &str = "test";

/// Package directory of the members in the captured fixtures.
pub const FIXTURE_PACKAGE: &str = "apps/eu.bluec0re.android-backup";

/// Returns the path of a file under `tests/data`.
pub fn data_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Reads a fixture file into memory.
pub fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(data_path(name)).expect("missing test fixture")
}

/// Options for an unencrypted backup with the given compression.
pub fn plain_options(compression: CompressionKind) -> WriteOptions {
    WriteOptions::new()
        .version(3)
        .compression(compression)
        .encryption(EncryptionKind::None)
}

/// Options for an AES-256 encrypted zlib backup with a cheap round count.
pub fn encrypted_options() -> WriteOptions {
    WriteOptions::android_default()
        .encryption(EncryptionKind::Aes256)
        .rounds(16)
}

/// Creates an in-memory backup from `(name, data)` pairs.
///
/// Returns both the backup bytes and the WriteResult metadata.
pub fn create_backup_with_result(
    options: WriteOptions,
    entries: &[(&str, &[u8])],
    password: Option<&str>,
) -> android_backup::Result<(Vec<u8>, WriteResult)> {
    let password = password.map(Password::new);
    let writer = BackupWriter::new(options);
    let members = entries
        .iter()
        .map(|(name, data)| PackEntry::from_bytes(MemberInfo::file(*name, 0), data.to_vec()));
    let mut out = Vec::new();
    let result = writer.write_data(&mut out, members, password.as_ref())?;
    Ok((out, result))
}

/// Creates an in-memory backup with default (zlib, unencrypted) options.
pub fn create_backup(entries: &[(&str, &[u8])]) -> android_backup::Result<Vec<u8>> {
    create_backup_with_result(WriteOptions::android_default(), entries, None).map(|(b, _)| b)
}

/// Opens an in-memory backup.
pub fn open(bytes: Vec<u8>) -> AndroidBackup<Cursor<Vec<u8>>> {
    AndroidBackup::open(Cursor::new(bytes)).expect("failed to open backup")
}

/// Collects the names of the given members.
pub fn names(members: &[MemberInfo]) -> Vec<&str> {
    members.iter().map(|m| m.name.as_str()).collect()
}
