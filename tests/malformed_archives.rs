//! Tests for malformed and corrupted backup handling.
//!
//! These tests verify that corrupted headers, envelopes and payloads are
//! reported with the right error family and never panic.

mod common;

use std::io::Cursor;

use android_backup::error::{FormatError, IntegrityError};
use android_backup::{AndroidBackup, Error, Password};
#[cfg(feature = "aes")]
use android_backup::{CompressionKind, ReadOptions, crypto::default_provider};
use common::{FIXTURE_PASSWORD, fixture, open};

fn open_err(bytes: &[u8]) -> Error {
    AndroidBackup::open(Cursor::new(bytes.to_vec())).unwrap_err()
}

// =============================================================================
// Header
// =============================================================================

#[test]
fn test_bad_magic() {
    for input in [
        &b""[..],
        b"ANDROID BACKUP",
        b"ANDROID BACKUPS\n3\n1\nnone\n",
        b"android backup\n3\n1\nnone\n",
        b"PK\x03\x04not a backup at all",
    ] {
        assert!(
            matches!(open_err(input), Error::Format(FormatError::BadMagic)),
            "{input:?}"
        );
    }
}

#[test]
fn test_bad_version() {
    for input in [
        &b"ANDROID BACKUP\n0\n1\nnone\n"[..],
        b"ANDROID BACKUP\n-3\n1\nnone\n",
        b"ANDROID BACKUP\nthree\n1\nnone\n",
        b"ANDROID BACKUP\n\n1\nnone\n",
        b"ANDROID BACKUP\n",
    ] {
        let err = open_err(input);
        assert!(
            matches!(err, Error::Format(FormatError::BadVersion(_))),
            "{input:?}: {err:?}"
        );
    }
}

#[test]
fn test_unknown_compression() {
    let err = open_err(b"ANDROID BACKUP\n3\n2\nnone\n");
    assert!(matches!(err, Error::Format(FormatError::UnknownCompression(ref s)) if s == "2"));
    assert!(err.is_format_error());
    assert!(!err.is_recoverable());
}

#[test]
fn test_unknown_encryption() {
    for token in ["AES-128", "aes-256", "", "NONE"] {
        let input = format!("ANDROID BACKUP\n3\n1\n{token}\n");
        let err = open_err(input.as_bytes());
        assert!(
            matches!(err, Error::Format(FormatError::UnknownEncryption(_))),
            "{token:?}: {err:?}"
        );
    }
}

#[test]
fn test_oversized_header_line() {
    let mut input = b"ANDROID BACKUP\n".to_vec();
    input.extend(std::iter::repeat_n(b'9', 100_000));
    assert!(open_err(&input).is_format_error());
}

// =============================================================================
// Key envelope
// =============================================================================

fn encrypted_with_envelope(lines: &[&str]) -> Vec<u8> {
    let mut data = b"ANDROID BACKUP\n3\n1\nAES-256\n".to_vec();
    for line in lines {
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
    }
    data
}

#[test]
fn test_truncated_envelope() {
    let fixture = fixture("encrypted_test.ab");
    for cut in [27, 100, 200, 300, 400, 500] {
        let mut backup = open(fixture[..cut].to_vec());
        let err = backup.key_envelope().unwrap_err();
        assert!(
            matches!(err, Error::Format(FormatError::MalformedEnvelope { .. })),
            "cut at {cut}: {err:?}"
        );
    }
}

#[test]
fn test_envelope_bad_hex() {
    let salt = "00".repeat(64);
    let iv = "00".repeat(16);
    let blob = "00".repeat(96);
    let cases = [
        (vec!["XYZ", salt.as_str(), "10000", iv.as_str(), blob.as_str()], "user salt"),
        (vec![salt.as_str(), "ABC", "10000", iv.as_str(), blob.as_str()], "checksum salt"),
        (vec![salt.as_str(), salt.as_str(), "ten", iv.as_str(), blob.as_str()], "rounds"),
        (vec![salt.as_str(), salt.as_str(), "0", iv.as_str(), blob.as_str()], "rounds"),
        (vec![salt.as_str(), salt.as_str(), "10000", "0011", blob.as_str()], "user iv"),
        (vec![salt.as_str(), salt.as_str(), "10000", iv.as_str(), "0G"], "master key blob"),
    ];

    for (lines, expected) in cases {
        let mut backup = open(encrypted_with_envelope(&lines));
        let err = backup.key_envelope().unwrap_err();
        assert!(
            matches!(err, Error::Format(FormatError::MalformedEnvelope { field, .. }) if field == expected),
            "{expected}: {err:?}"
        );
    }
}

#[test]
fn test_envelope_lowercase_hex_accepted() {
    let salt = "ab".repeat(64);
    let iv = "cd".repeat(16);
    let blob = "ef".repeat(96);
    let mut backup = open(encrypted_with_envelope(&[
        salt.as_str(),
        salt.as_str(),
        "5",
        iv.as_str(),
        blob.as_str(),
    ]));
    let envelope = backup.key_envelope().unwrap().unwrap();
    assert_eq!(envelope.user_salt, vec![0xAB; 64]);
    assert_eq!(envelope.iv, [0xCD; 16]);
    assert_eq!(envelope.rounds, 5);
}

#[cfg(feature = "aes")]
#[test]
fn test_unaligned_master_blob() {
    let salt = "00".repeat(64);
    let iv = "00".repeat(16);
    let blob = "00".repeat(95);
    let mut backup = open(encrypted_with_envelope(&[
        salt.as_str(),
        salt.as_str(),
        "1",
        iv.as_str(),
        blob.as_str(),
    ]));
    let err = backup.members(Some(&Password::new("pw"))).unwrap_err();
    assert!(err.is_format_error(), "{err:?}");
}

#[cfg(feature = "aes")]
#[test]
fn test_corrupted_master_blob() {
    let mut data = fixture("encrypted_test.ab");
    // last hex digit of the master key blob line
    let blob_end = 517 - 2;
    data[blob_end] = if data[blob_end] == b'0' { b'1' } else { b'0' };
    let mut backup = open(data);
    let err = backup
        .members(Some(&Password::new(FIXTURE_PASSWORD)))
        .unwrap_err();
    assert!(err.is_integrity_error(), "{err:?}");
}

// =============================================================================
// Payload
// =============================================================================

#[cfg(feature = "aes")]
#[test]
fn test_unaligned_ciphertext() {
    let mut data = fixture("encrypted_test.ab");
    data.pop();
    let mut backup = open(data);
    let err = backup
        .members(Some(&Password::new(FIXTURE_PASSWORD)))
        .unwrap_err();
    assert!(matches!(err, Error::Integrity(IntegrityError::BadPadding)), "{err:?}");
}

#[cfg(feature = "aes")]
fn open_in_mode(bytes: &[u8], options: ReadOptions) -> AndroidBackup<Cursor<Vec<u8>>> {
    AndroidBackup::open_with(Cursor::new(bytes.to_vec()), options, default_provider()).unwrap()
}

#[cfg(feature = "aes")]
fn read_modes() -> [ReadOptions; 2] {
    [ReadOptions::new(), ReadOptions::new().buffered()]
}

#[cfg(feature = "aes")]
#[test]
fn test_truncated_ciphertext_is_an_error() {
    let data = fixture("encrypted_test.ab");
    // drop two whole blocks so the stream ends early and padding is wrong
    let data = &data[..data.len() - 32];
    let password = Password::new(FIXTURE_PASSWORD);
    for options in read_modes() {
        let mode = options.mode;
        let err = open_in_mode(data, options)
            .members(Some(&password))
            .unwrap_err();
        assert!(
            matches!(err, Error::Integrity(IntegrityError::BadPadding)),
            "{mode:?}: {err:?}"
        );
    }
}

#[cfg(feature = "aes")]
#[test]
fn test_corrupted_terminal_block_fails_in_every_mode() {
    // 512 header + 2560 content + 1024 end blocks: the tar fills exactly 4096
    // bytes, so the padding block follows a full inflate-sized pull.
    let content = vec![0x5A; 2560];
    let (mut data, _) = common::create_backup_with_result(
        common::encrypted_options().compression(CompressionKind::None),
        &[("apps/pkg/f/blob", &content[..])],
        Some("pw"),
    )
    .unwrap();
    let n = data.len();
    data[n - 20] ^= 0xFF;

    let password = Password::new("pw");
    for options in read_modes() {
        let mode = options.mode;
        let err = open_in_mode(&data, options.clone())
            .members(Some(&password))
            .unwrap_err();
        assert!(
            matches!(err, Error::Integrity(IntegrityError::BadPadding)),
            "members in {mode:?}: {err:?}"
        );

        let dir = tempfile::tempdir().unwrap();
        let err = open_in_mode(&data, options)
            .extract_all(dir.path(), Some(&password))
            .unwrap_err();
        assert!(err.is_integrity_error(), "extract in {mode:?}: {err:?}");
    }
}

#[test]
fn test_truncated_zlib_stream() {
    let data = fixture("compressed.ab");
    let mut backup = open(data[..data.len() - 100].to_vec());
    let dir = tempfile::tempdir().unwrap();
    assert!(backup.extract_all(dir.path(), None).is_err());
}

#[test]
fn test_garbage_zlib_stream() {
    let mut data = b"ANDROID BACKUP\n3\n1\nnone\n".to_vec();
    data.extend_from_slice(&[0xFF; 64]);
    let mut backup = open(data);
    assert!(backup.members(None).is_err());
}

#[test]
fn test_empty_payload() {
    let mut stored = open(b"ANDROID BACKUP\n3\n0\nnone\n".to_vec());
    assert!(stored.members(None).unwrap().is_empty());

    let mut deflated = open(b"ANDROID BACKUP\n3\n1\nnone\n".to_vec());
    assert!(deflated.members(None).is_err());
}

#[test]
fn test_member_escaping_target_is_rejected() {
    let mut header = tar::Header::new_ustar();
    let name = b"../evil.txt";
    header.as_old_mut().name[..name.len()].copy_from_slice(name);
    header.set_size(4);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();

    let mut builder = tar::Builder::new(Vec::new());
    builder.append(&header, &b"evil"[..]).unwrap();
    let tar = builder.into_inner().unwrap();

    let mut data = b"ANDROID BACKUP\n3\n0\nnone\n".to_vec();
    data.extend(tar);

    let work = tempfile::tempdir().unwrap();
    let target = work.path().join("target");
    let mut backup = open(data);
    let err = backup.extract_all(&target, None).unwrap_err();
    assert!(matches!(err, Error::PathTraversal { ref path } if path == "../evil.txt"));
    assert!(!work.path().join("evil.txt").exists());
}
