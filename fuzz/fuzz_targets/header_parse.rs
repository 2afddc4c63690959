//! Fuzz target for header and key envelope parsing.
//!
//! Run with: cargo +nightly fuzz run header_parse

#![no_main]

use android_backup::{BackupHeader, KeyEnvelope};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data);
    if let Ok((header, consumed)) = BackupHeader::read(&mut cursor) {
        assert!(consumed as usize <= data.len());
        let reparsed = BackupHeader::read(&mut Cursor::new(header.to_bytes()));
        assert_eq!(reparsed.ok().map(|(h, _)| h), Some(header));
    }

    // The envelope parser sees the same bytes as an encrypted payload prefix
    let mut cursor = Cursor::new(data);
    if let Ok((envelope, consumed)) = KeyEnvelope::read(&mut cursor) {
        assert!(consumed as usize <= data.len());
        let _ = envelope.check_rounds(1_000);
    }
});
