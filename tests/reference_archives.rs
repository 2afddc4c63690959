//! Tests against backups captured from a real device.
//!
//! `tests/data` holds three fixtures:
//!
//! - `compressed.ab`: zlib, unencrypted, four members of one app.
//! - `encrypted_test.ab`: the same content, AES-256 encrypted with the
//!   password `test` and 10000 PBKDF2 rounds. Its master key contains bytes
//!   above 0x7F, so the checksum only verifies through the UTF-8 quirk.
//! - `single_empty_member.ab`: one empty member `a`.

mod common;

use std::io::{Cursor, Read, Seek, SeekFrom};

use android_backup::crypto::default_provider;
use android_backup::{
    AndroidBackup, CompressionKind, EncryptionKind, Error, MemberKind, Password, ReadOptions,
};
use common::{FIXTURE_PACKAGE, FIXTURE_PASSWORD, data_path, fixture, names, open};

fn fixture_names() -> Vec<String> {
    ["_manifest", "r/settings.cfg", "db/foo.db", "sp/foo.xml"]
        .iter()
        .map(|m| format!("{FIXTURE_PACKAGE}/{m}"))
        .collect()
}

// =============================================================================
// Header
// =============================================================================

#[test]
fn test_compressed_header() {
    let backup = AndroidBackup::open_path(data_path("compressed.ab")).unwrap();
    assert_eq!(backup.version(), 3);
    assert_eq!(backup.compression(), CompressionKind::Zlib);
    assert_eq!(backup.encryption(), EncryptionKind::None);
    assert_eq!(backup.payload_start(), 24);
    assert_eq!(
        backup.header().to_string(),
        "Version: 3\nCompression: zlib\nEncryption: none"
    );
}

#[test]
fn test_encrypted_header_and_info() {
    let mut backup = AndroidBackup::open_path(data_path("encrypted_test.ab")).unwrap();
    assert!(backup.is_encrypted());
    assert_eq!(backup.encryption(), EncryptionKind::Aes256);

    let info = backup.info().unwrap();
    assert_eq!(info.payload_offset, 27);
    assert_eq!(info.total_size, 1781);
    let enc = info.encryption_info.as_ref().expect("encrypted backup has envelope info");
    assert_eq!(enc.rounds, 10000);
    assert_eq!(enc.user_salt_size, 64);
    assert_eq!(enc.checksum_salt_size, 64);
    assert_eq!(enc.master_blob_size, 96);
    assert_eq!(info.data_size(), 1264);

    let envelope = backup.key_envelope().unwrap().unwrap();
    assert_eq!(hex::encode_upper(envelope.iv), "59983381B8CC1052856DF1B4125ACFED");
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn test_list_compressed() {
    let mut backup = AndroidBackup::open_path(data_path("compressed.ab")).unwrap();
    let members = backup.members(None).unwrap();
    assert_eq!(names(&members), fixture_names());

    let sizes: Vec<u64> = members.iter().map(|m| m.size).collect();
    assert_eq!(sizes, vec![1467, 8, 8192, 54]);

    for member in &members {
        assert_eq!(member.kind, MemberKind::File);
        assert_eq!(member.mode, 0o644);
        assert_eq!((member.uid, member.gid), (1000, 100));
        assert_eq!(member.uname, "bluec0re");
        assert_eq!(member.gname, "users");
    }
    assert!(members[1].listing_line().starts_with("-rw-r--r-- bluec0re/users"));
    assert!(members[1].listing_line().ends_with("r/settings.cfg"));
}

#[cfg(feature = "aes")]
#[test]
fn test_list_encrypted() {
    let mut backup = AndroidBackup::open_path(data_path("encrypted_test.ab")).unwrap();
    let members = backup
        .members(Some(&Password::new(FIXTURE_PASSWORD)))
        .unwrap();
    assert_eq!(names(&members), fixture_names());
}

#[cfg(feature = "aes")]
#[test]
fn test_encrypted_and_compressed_payloads_match() {
    let password = Password::new(FIXTURE_PASSWORD);
    let mut plain = Vec::new();
    AndroidBackup::open_path(data_path("compressed.ab"))
        .unwrap()
        .read_data(None)
        .unwrap()
        .read_to_end(&mut plain)
        .unwrap();

    let mut decrypted = Vec::new();
    let mut backup = AndroidBackup::open_path(data_path("encrypted_test.ab")).unwrap();
    backup
        .read_data(Some(&password))
        .unwrap()
        .read_to_end(&mut decrypted)
        .unwrap();

    assert_eq!(plain.len(), 20480);
    assert_eq!(plain, decrypted);
}

#[test]
fn test_single_empty_member() {
    let data = fixture("single_empty_member.ab");
    assert!(data.starts_with(b"ANDROID BACKUP\n3\n1\nnone\n"));

    let mut backup = open(data);
    let members = backup.members(None).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "a");
    assert_eq!(members[0].size, 0);
    assert!(members[0].is_file());
}

// =============================================================================
// Extraction
// =============================================================================

#[test]
fn test_extract_compressed_streaming() {
    let mut backup = AndroidBackup::open_path(data_path("compressed.ab")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let manifest = backup.extract_all(dir.path(), None).unwrap();

    assert_eq!(manifest.names(), fixture_names());
    let pkg = dir.path().join(FIXTURE_PACKAGE);
    assert_eq!(std::fs::read(pkg.join("r/settings.cfg")).unwrap(), b"foo=bar\n");
    assert_eq!(
        std::fs::read_to_string(pkg.join("sp/foo.xml")).unwrap(),
        "<?xml version=\"1.0\"?>\n<root>\n    <bar>1</bar>\n</root>\n"
    );
    assert_eq!(std::fs::metadata(pkg.join("db/foo.db")).unwrap().len(), 8192);
    assert_eq!(std::fs::metadata(pkg.join("_manifest")).unwrap().len(), 1467);
}

#[cfg(feature = "aes")]
#[test]
fn test_extract_encrypted_buffered() {
    let mut backup = AndroidBackup::open_path_with(
        data_path("encrypted_test.ab"),
        ReadOptions::new().buffered(),
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let manifest = backup
        .extract_all(dir.path(), Some(&Password::new(FIXTURE_PASSWORD)))
        .unwrap();

    assert_eq!(manifest.len(), 4);
    let settings = dir.path().join(FIXTURE_PACKAGE).join("r/settings.cfg");
    assert_eq!(std::fs::read(settings).unwrap(), b"foo=bar\n");
}

#[cfg(feature = "aes")]
#[test]
fn test_extract_encrypted_streaming_small_chunks() {
    let options = ReadOptions::new()
        .decrypt_chunk_size(16)
        .inflate_chunk_size(7);
    let mut backup =
        AndroidBackup::open_path_with(data_path("encrypted_test.ab"), options).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let manifest = backup
        .extract_all(dir.path(), Some(&Password::new(FIXTURE_PASSWORD)))
        .unwrap();
    assert_eq!(manifest.names(), fixture_names());
}

// =============================================================================
// Password handling
// =============================================================================

#[cfg(feature = "aes")]
#[test]
fn test_wrong_password_is_integrity_error() {
    let mut backup = AndroidBackup::open_path(data_path("encrypted_test.ab")).unwrap();
    let err = backup
        .members(Some(&Password::new("not the password")))
        .unwrap_err();
    assert!(err.is_integrity_error(), "unexpected error: {err:?}");
    assert!(err.is_recoverable());
}

#[test]
fn test_missing_password() {
    let mut backup = AndroidBackup::open_path(data_path("encrypted_test.ab")).unwrap();
    let err = backup.members(None).unwrap_err();
    assert!(err.is_config_error());

    let dir = tempfile::tempdir().unwrap();
    assert!(backup.extract_all(dir.path(), None).unwrap_err().is_config_error());
}

#[test]
fn test_password_ignored_for_unencrypted() {
    let mut backup = AndroidBackup::open_path(data_path("compressed.ab")).unwrap();
    let members = backup.members(Some(&Password::new("unused"))).unwrap();
    assert_eq!(members.len(), 4);
}

#[cfg(feature = "aes")]
#[test]
fn test_kdf_round_limit() {
    let mut backup = AndroidBackup::open_path_with(
        data_path("encrypted_test.ab"),
        ReadOptions::new().max_kdf_rounds(1000),
    )
    .unwrap();
    let err = backup
        .members(Some(&Password::new(FIXTURE_PASSWORD)))
        .unwrap_err();
    assert!(matches!(err, Error::ResourceLimitExceeded(_)));
}

// =============================================================================
// Payload reader behavior
// =============================================================================

#[test]
fn test_streaming_rejects_backward_seek() {
    let mut backup = AndroidBackup::open_path(data_path("compressed.ab")).unwrap();
    let mut payload = backup.read_data(None).unwrap();

    let mut first = [0u8; 512];
    payload.read_exact(&mut first).unwrap();
    assert_eq!(&first[..4], b"apps");

    // forward seeks skip through the stream
    assert_eq!(payload.seek(SeekFrom::Current(512)).unwrap(), 1024);
    let err = payload.seek(SeekFrom::Start(0)).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
    let err = payload.seek(SeekFrom::End(0)).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
}

#[test]
fn test_streaming_read_never_overshoots() {
    let mut backup = AndroidBackup::open_path(data_path("compressed.ab")).unwrap();
    let mut payload = backup.read_data(None).unwrap();
    let mut total = 0usize;
    let mut buf = [0u8; 1000];
    loop {
        let n = payload.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        assert!(n <= buf.len());
        total += n;
    }
    assert_eq!(total, 20480);
}

#[test]
fn test_open_at_offset() {
    let mut data = b"junk".to_vec();
    data.extend(fixture("single_empty_member.ab"));
    let mut cursor = Cursor::new(data);
    cursor.seek(SeekFrom::Start(4)).unwrap();

    let mut backup = AndroidBackup::open_with(cursor, ReadOptions::default(), default_provider())
        .unwrap();
    assert_eq!(backup.payload_start(), 28);
    assert_eq!(backup.members(None).unwrap().len(), 1);
}

// =============================================================================
// Key wrapping regression
// =============================================================================

#[cfg(feature = "aes")]
mod regression {
    use super::*;
    use android_backup::crypto::{decrypt_payload, seal};
    use android_backup::{BackupHeader, EnvelopeSeed, KeyEnvelope};

    /// Re-sealing the captured payload with the captured key material must
    /// reproduce the envelope and ciphertext byte for byte.
    #[test]
    fn test_seal_reproduces_captured_envelope() {
        let data = fixture("encrypted_test.ab");
        let password = Password::new(FIXTURE_PASSWORD);
        let provider = default_provider();

        let mut cursor = Cursor::new(&data[..]);
        let (header, header_len) = BackupHeader::read(&mut cursor).unwrap();
        assert!(header.is_encrypted());
        let (envelope, envelope_len) = KeyEnvelope::read(&mut cursor).unwrap();
        let data_start = (header_len + envelope_len) as usize;
        let ciphertext = &data[data_start..];
        assert_eq!(ciphertext.len(), 1264);

        let master = envelope.unwrap(&password, provider.as_ref()).unwrap();
        let compressed = decrypt_payload(
            provider.cbc_decryptor(master.key(), &master.iv).unwrap(),
            ciphertext,
        )
        .unwrap();

        let seed = EnvelopeSeed::explicit(
            *master.key(),
            envelope.checksum_salt.clone(),
            envelope.user_salt.clone(),
            master.iv,
            envelope.iv,
            envelope.rounds,
        );
        let (sealed, resealed) = seal(&compressed, &password, &seed, provider.as_ref()).unwrap();

        assert_eq!(sealed, envelope);
        assert_eq!(resealed, ciphertext);

        let mut lines = Vec::new();
        sealed.write(&mut lines).unwrap();
        assert_eq!(lines, &data[header_len as usize..data_start]);
    }

    #[test]
    fn test_master_key_needs_compat_checksum() {
        let data = fixture("encrypted_test.ab");
        let mut cursor = Cursor::new(&data[..]);
        BackupHeader::read(&mut cursor).unwrap();
        let (envelope, _) = KeyEnvelope::read(&mut cursor).unwrap();

        let provider = default_provider();
        let master = envelope
            .unwrap(&Password::new(FIXTURE_PASSWORD), provider.as_ref())
            .unwrap();
        assert!(master.key().iter().any(|b| *b > 0x7F));

        let raw = provider
            .derive_key(master.key(), &envelope.checksum_salt, envelope.rounds)
            .unwrap();
        assert_ne!(raw.as_slice(), master.checksum.as_slice());
    }
}
