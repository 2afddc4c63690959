//! Fuzz target for opening and listing arbitrary backups.
//!
//! This target runs the whole unpack pipeline on potentially malformed input:
//! header, key envelope, decryption, inflation and tar parsing. The goal is
//! to find panics or hangs; errors are expected.
//!
//! Run with: cargo +nightly fuzz run backup_open

#![no_main]

use android_backup::{AndroidBackup, Password, ReadOptions};
use android_backup::crypto::default_provider;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Keep the key derivation cheap so the fuzzer reaches the payload
    let options = ReadOptions::new().max_kdf_rounds(16);
    let Ok(mut backup) = AndroidBackup::open_with(Cursor::new(data), options, default_provider())
    else {
        return;
    };

    let _ = backup.info();
    let password = Password::new("fuzz");
    if let Ok(members) = backup.members(Some(&password)) {
        for member in &members {
            let _ = member.listing_line();
        }
    }
});
