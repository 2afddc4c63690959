//! Property-based tests using proptest.
//!
//! These tests verify invariants of the header codec, the key checksum
//! transform and the streaming proxy using randomly generated inputs.

mod common;

use proptest::prelude::*;
use std::io::{Cursor, Read};

use android_backup::codec::{DeflateOptions, InflateTransform, deflate_all};
use android_backup::crypto::utf8_compat;
use android_backup::streaming::{Passthrough, TransformReader};
use android_backup::{BackupHeader, CompressionKind, EncryptionKind};

fn compression_strategy() -> impl Strategy<Value = CompressionKind> {
    prop_oneof![Just(CompressionKind::None), Just(CompressionKind::Zlib)]
}

fn encryption_strategy() -> impl Strategy<Value = EncryptionKind> {
    prop_oneof![Just(EncryptionKind::None), Just(EncryptionKind::Aes256)]
}

/// A reader returning at most `max` bytes per call.
struct Trickle<R> {
    inner: R,
    max: usize,
}

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.max);
        self.inner.read(&mut buf[..n])
    }
}

proptest! {
    /// Every valid header survives write followed by read.
    #[test]
    fn header_roundtrip(
        version in 1u32..=u32::MAX,
        compression in compression_strategy(),
        encryption in encryption_strategy(),
    ) {
        let header = BackupHeader::new(version, compression, encryption);
        let bytes = header.to_bytes();
        let mut cursor = Cursor::new(&bytes);
        let (parsed, consumed) = BackupHeader::read(&mut cursor).unwrap();
        prop_assert_eq!(parsed, header);
        prop_assert_eq!(consumed, bytes.len() as u64);
    }

    /// Header parsing never panics and never consumes past the input.
    #[test]
    fn header_parse_arbitrary(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let mut cursor = Cursor::new(&data);
        if let Ok((_, consumed)) = BackupHeader::read(&mut cursor) {
            prop_assert_eq!(consumed, cursor.position());
            prop_assert!(consumed as usize <= data.len());
        }
    }

    /// ASCII bytes pass through unchanged.
    #[test]
    fn utf8_compat_keeps_ascii(data in proptest::collection::vec(0u8..=0x7F, 0..64)) {
        prop_assert_eq!(utf8_compat(&data), data);
    }

    /// Each byte maps to exactly one code point, high bytes into U+FF80..=U+FFFF.
    #[test]
    fn utf8_compat_code_points(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let encoded = utf8_compat(&data);
        let text = std::str::from_utf8(&encoded).expect("transform output is valid UTF-8");
        let chars: Vec<char> = text.chars().collect();
        prop_assert_eq!(chars.len(), data.len());

        for (byte, ch) in data.iter().zip(&chars) {
            let cp = *ch as u32;
            prop_assert!(!(0x100..=0xFF7F).contains(&cp));
            if *byte <= 0x7F {
                prop_assert_eq!(cp, u32::from(*byte));
            } else {
                prop_assert_eq!(cp, 0xFF00 | u32::from(*byte));
            }
        }
    }

    /// `pull(n)` never returns more than `n` bytes, and only returns fewer
    /// at end of stream.
    #[test]
    fn proxy_short_reads_only_at_end(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        chunk_size in 1usize..600,
        source_max in 1usize..300,
        requests in proptest::collection::vec(1usize..700, 1..64),
    ) {
        let source = Trickle { inner: Cursor::new(data.clone()), max: source_max };
        let mut reader = TransformReader::with_chunk_size(source, Passthrough, chunk_size);
        let mut out = Vec::new();

        for n in requests.iter().cycle() {
            let got = reader.pull(*n).unwrap();
            prop_assert!(got.len() <= *n);
            let short = got.len() < *n;
            out.extend_from_slice(&got);
            if short {
                prop_assert_eq!(out.len(), data.len());
                break;
            }
        }

        prop_assert_eq!(&out, &data);
        prop_assert!(reader.pull(1).unwrap().is_empty());
        prop_assert_eq!(reader.position(), data.len() as u64);
    }

    /// Inflating through the proxy matches the input for any chunk size.
    #[test]
    fn proxy_inflate_any_chunk_size(
        data in proptest::collection::vec(any::<u8>(), 0..8192),
        chunk_size in 1usize..2048,
        level in 0u32..=9,
    ) {
        let compressed = deflate_all(&data, &DeflateOptions::with_level(level)).unwrap();
        let mut reader = TransformReader::with_chunk_size(
            Cursor::new(compressed),
            InflateTransform::new(),
            chunk_size,
        );
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        prop_assert_eq!(out, data);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Unencrypted backups of arbitrary content list and read back intact.
    #[test]
    fn backup_roundtrip(
        contents in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..2048), 0..6),
        compression in compression_strategy(),
    ) {
        let names: Vec<String> = (0..contents.len()).map(|i| format!("apps/pkg/f/{i}")).collect();
        let entries: Vec<(&str, &[u8])> = names
            .iter()
            .zip(&contents)
            .map(|(n, c)| (n.as_str(), c.as_slice()))
            .collect();

        let (bytes, _) =
            common::create_backup_with_result(common::plain_options(compression), &entries, None)
                .unwrap();
        let mut backup = common::open(bytes);
        let members = backup.members(None).unwrap();
        prop_assert_eq!(members.len(), contents.len());
        for (member, content) in members.iter().zip(&contents) {
            prop_assert_eq!(member.size, content.len() as u64);
        }
    }
}
