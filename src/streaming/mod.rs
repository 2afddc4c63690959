//! Pull-based streaming transforms.
//!
//! Every stage of the unpack pipeline (decryption, decompression) is a
//! [`ChunkTransform`] driven by a [`TransformReader`]. Stages stack: the
//! reader of one stage is the source of the next, and each stage exclusively
//! owns the stage below it.
//!
//! # Example
//!
//! ```rust
//! use std::io::Read;
//! use android_backup::streaming::{Passthrough, TransformReader};
//!
//! let source = std::io::Cursor::new(b"hello world".to_vec());
//! let mut reader = TransformReader::with_chunk_size(source, Passthrough, 4);
//!
//! let mut out = [0u8; 8];
//! assert_eq!(reader.read(&mut out).unwrap(), 8);
//! assert_eq!(&out, b"hello wo");
//! ```
//!
//! # Forward-only access
//!
//! A [`TransformReader`] implements [`std::io::Seek`] only for position
//! queries and forward skips. Seeking backwards (or relative to the end)
//! fails with [`std::io::ErrorKind::Unsupported`].

pub mod proxy;

pub use proxy::{ChunkTransform, DEFAULT_CHUNK_SIZE, Passthrough, TransformReader};
