//! zlib codec for backup payloads.

use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::Result;
use crate::streaming::ChunkTransform;

/// Output growth step while inflating.
const OUTPUT_STEP: usize = 16 * 1024;

/// Deflate encoder options.
#[derive(Debug, Clone)]
pub struct DeflateOptions {
    /// Compression level (0-9, default 6).
    pub level: u32,
}

impl Default for DeflateOptions {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DeflateOptions {
    /// Creates options with the given compression level.
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

/// Incremental zlib inflater driven by [`crate::streaming::TransformReader`].
///
/// Bytes after the end of the zlib stream are ignored. A source that ends
/// before the zlib end marker yields [`io::ErrorKind::UnexpectedEof`].
pub struct InflateTransform {
    inner: Decompress,
    finished: bool,
}

impl std::fmt::Debug for InflateTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflateTransform")
            .field("total_in", &self.inner.total_in())
            .field("total_out", &self.inner.total_out())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Default for InflateTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl InflateTransform {
    /// Creates an inflater expecting a zlib header.
    pub fn new() -> Self {
        Self {
            inner: Decompress::new(true),
            finished: false,
        }
    }

    /// Returns `true` once the zlib end marker has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ChunkTransform for InflateTransform {
    fn transform(&mut self, chunk: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(chunk.len().saturating_mul(4).max(OUTPUT_STEP));
        let mut input = chunk;

        while !self.finished {
            if out.len() == out.capacity() {
                out.reserve(OUTPUT_STEP);
            }
            let before_in = self.inner.total_in();
            let before_out = self.inner.total_out();
            let status = self
                .inner
                .decompress_vec(input, &mut out, FlushDecompress::None)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let consumed = (self.inner.total_in() - before_in) as usize;
            let produced = self.inner.total_out() - before_out;
            input = &input[consumed..];

            if status == Status::StreamEnd {
                self.finished = true;
                if !input.is_empty() {
                    log::debug!("ignoring {} bytes after zlib stream end", input.len());
                }
                break;
            }
            let has_room = out.len() < out.capacity();
            if has_room && (input.is_empty() || (consumed == 0 && produced == 0)) {
                break;
            }
        }
        Ok(out)
    }

    fn needs_input(&self) -> bool {
        !self.finished
    }

    fn finish(&mut self) -> io::Result<Vec<u8>> {
        if self.finished {
            Ok(Vec::new())
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "zlib stream ended before its end marker",
            ))
        }
    }
}

/// Inflates a complete zlib stream held in memory.
pub fn inflate_all(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = InflateTransform::new();
    let mut out = inflater.transform(data)?;
    out.extend(inflater.finish()?);
    Ok(out)
}

/// Compresses `data` into a single zlib stream.
pub fn deflate_all(data: &[u8], options: &DeflateOptions) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(options.level.min(9)),
    );
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
