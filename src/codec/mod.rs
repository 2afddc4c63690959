//! Payload compression.
//!
//! Android backups compress the tar member stream with zlib. Reading can
//! inflate incrementally through the streaming proxy
//! ([`InflateTransform`]) or all at once ([`inflate_all`]); writing always
//! compresses the complete container in one call ([`deflate_all`]).

pub mod deflate;

pub use deflate::{DeflateOptions, InflateTransform, deflate_all, inflate_all};
