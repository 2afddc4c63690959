//! # android-backup
//!
//! A pure-Rust library for unpacking and repacking Android backup (`.ab`)
//! archives, as produced by `adb backup`.
//!
//! A backup is a short text header followed by a tar stream that may be
//! zlib-compressed and AES-256 encrypted under a password. This crate parses
//! and writes the header, reproduces Android's password-based key wrapping
//! bit for bit, and streams the payload through decryption and
//! decompression into the `tar` crate.
//!
//! ## Quick Start
//!
//! ### Listing and extracting a backup
//!
//! ```rust,no_run
//! use android_backup::{AndroidBackup, Result};
//!
//! fn main() -> Result<()> {
//!     let mut backup = AndroidBackup::open_path("backup.ab")?;
//!     println!("{}", backup.header());
//!
//!     for member in backup.members(None)? {
//!         println!("{}", member.listing_line());
//!     }
//!
//!     let manifest = backup.extract_all("backup.ab_unpacked", None)?;
//!     manifest.save("backup.ab.manifest.json")?;
//!     Ok(())
//! }
//! ```
//!
//! ### Repacking a directory
//!
//! ```rust,no_run
//! use android_backup::{BackupWriter, Manifest, Result, WriteOptions};
//!
//! fn main() -> Result<()> {
//!     let manifest = Manifest::load("backup.ab.manifest.json")?;
//!     let writer = BackupWriter::new(WriteOptions::android_default());
//!
//!     let mut out = std::fs::File::create("backup.ab")?;
//!     let result = writer.pack_dir(&mut out, "backup.ab_unpacked", &manifest, None)?;
//!     println!("Wrote {} members ({:.1}% compression)",
//!         result.members_written,
//!         result.space_savings() * 100.0);
//!     Ok(())
//! }
//! ```
//!
//! ### Encrypted backups
//!
//! ```rust,no_run
//! use android_backup::{AndroidBackup, Error, Password};
//!
//! let mut backup = AndroidBackup::open_path("encrypted.ab")?;
//! match backup.members(Some(&Password::new("secret"))) {
//!     Ok(members) => println!("{} members", members.len()),
//!     Err(Error::Integrity(_)) => eprintln!("wrong password or corrupted backup"),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `aes` | Yes | AES-256 encryption via the RustCrypto crates |
//! | `cli` | No | Command-line interface tool |
//!
//! Without `aes`, encrypted backups fail with
//! [`EnvironmentError::CryptoUnavailable`](error::EnvironmentError).
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod codec;
pub mod crypto;
pub mod error;
pub mod format;
pub mod manifest;
pub mod member;
pub mod read;
pub mod streaming;
pub mod write;

pub use error::{Error, Result};

pub use crypto::{CryptoProvider, EnvelopeSeed, KeyEnvelope, Password};
pub use format::{BackupHeader, CompressionKind, EncryptionKind};
pub use manifest::Manifest;
pub use member::{MemberInfo, MemberKind};

// Re-export reading API at crate root for convenience
pub use read::{AndroidBackup, BackupInfo, PayloadReader, ReadMode, ReadOptions};

// Re-export writing API at crate root for convenience
pub use write::{BackupWriter, PackEntry, WriteOptions, WriteResult};
