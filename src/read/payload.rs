//! The decoded payload stream.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use crate::streaming::{ChunkTransform, TransformReader};

/// Boxed pipeline stage reading from a borrowed source.
pub(crate) type Stage<'a> = TransformReader<Box<dyn Read + 'a>, Box<dyn ChunkTransform + 'a>>;

/// The plaintext tar stream of a backup.
///
/// In streaming mode the reader is forward-only: seeking backwards fails
/// with [`io::ErrorKind::Unsupported`]. In buffered mode the whole payload
/// is held in memory and seeks freely.
pub enum PayloadReader<'a> {
    /// Incremental decrypt/inflate pipeline.
    Streaming(Stage<'a>),
    /// Fully materialised payload.
    Buffered(Cursor<Vec<u8>>),
}

impl std::fmt::Debug for PayloadReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadReader::Streaming(stage) => f.debug_tuple("Streaming").field(stage).finish(),
            PayloadReader::Buffered(cursor) => f
                .debug_struct("Buffered")
                .field("len", &cursor.get_ref().len())
                .field("position", &cursor.position())
                .finish(),
        }
    }
}

impl PayloadReader<'_> {
    /// Returns `true` if the reader can seek backwards.
    pub fn is_seekable(&self) -> bool {
        matches!(self, PayloadReader::Buffered(_))
    }

    /// Returns the number of plaintext bytes consumed so far.
    pub fn position(&self) -> u64 {
        match self {
            PayloadReader::Streaming(stage) => stage.position(),
            PayloadReader::Buffered(cursor) => cursor.position(),
        }
    }

    /// Returns the buffered plaintext, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PayloadReader::Streaming(_) => None,
            PayloadReader::Buffered(cursor) => Some(cursor.get_ref()),
        }
    }
}

impl Read for PayloadReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            PayloadReader::Streaming(stage) => stage.read(buf),
            PayloadReader::Buffered(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for PayloadReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            PayloadReader::Streaming(stage) => stage.seek(pos),
            PayloadReader::Buffered(cursor) => cursor.seek(pos),
        }
    }
}
