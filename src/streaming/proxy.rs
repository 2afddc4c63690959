//! The streaming transform proxy.

use std::io::{self, Read, Seek, SeekFrom};

use crate::format::reader::read_full;

/// Default number of source bytes pulled per transform invocation.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// A stateful transform applied to consecutive chunks of a byte stream.
///
/// Errors are reported as [`io::Error`]; crate errors travel boxed inside
/// them and can be recovered with [`crate::Error::from_io`].
pub trait ChunkTransform {
    /// Transforms one chunk of source bytes.
    ///
    /// Returning an empty buffer ends the stream unless
    /// [`needs_input`](Self::needs_input) reports otherwise.
    fn transform(&mut self, chunk: &[u8]) -> io::Result<Vec<u8>>;

    /// Returns `true` while the transform cannot make progress without more
    /// input, even though its last invocation produced no output.
    fn needs_input(&self) -> bool {
        false
    }

    /// Called once when the source is exhausted.
    ///
    /// May emit trailing output or report a truncated stream.
    fn finish(&mut self) -> io::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

impl<T: ChunkTransform + ?Sized> ChunkTransform for Box<T> {
    fn transform(&mut self, chunk: &[u8]) -> io::Result<Vec<u8>> {
        (**self).transform(chunk)
    }

    fn needs_input(&self) -> bool {
        (**self).needs_input()
    }

    fn finish(&mut self) -> io::Result<Vec<u8>> {
        (**self).finish()
    }
}

/// The identity transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ChunkTransform for Passthrough {
    fn transform(&mut self, chunk: &[u8]) -> io::Result<Vec<u8>> {
        Ok(chunk.to_vec())
    }
}

/// A buffered, forward-only reader over a transformed byte source.
///
/// Source bytes are pulled in fixed-size chunks (each read completely
/// unless the source ends), passed through the transform, and buffered
/// until a request can be served. A read of `n` bytes returns fewer than
/// `n` only at end of stream.
pub struct TransformReader<R, T> {
    source: R,
    transform: T,
    chunk_size: usize,
    chunk: Vec<u8>,
    buffer: Vec<u8>,
    pos: usize,
    exhausted: bool,
    position: u64,
}

impl<R, T> std::fmt::Debug for TransformReader<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformReader")
            .field("chunk_size", &self.chunk_size)
            .field("buffered", &(self.buffer.len() - self.pos))
            .field("exhausted", &self.exhausted)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl<R: Read, T: ChunkTransform> TransformReader<R, T> {
    /// Creates a reader pulling [`DEFAULT_CHUNK_SIZE`] bytes at a time.
    pub fn new(source: R, transform: T) -> Self {
        Self::with_chunk_size(source, transform, DEFAULT_CHUNK_SIZE)
    }

    /// Creates a reader pulling `chunk_size` bytes at a time.
    ///
    /// A chunk size of zero is treated as one.
    pub fn with_chunk_size(source: R, transform: T, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            source,
            transform,
            chunk_size,
            chunk: vec![0u8; chunk_size],
            buffer: Vec::new(),
            pos: 0,
            exhausted: false,
            position: 0,
        }
    }

    /// Returns up to `n` transformed bytes.
    ///
    /// Fewer than `n` bytes are returned only at end of stream.
    pub fn pull(&mut self, n: usize) -> io::Result<Vec<u8>> {
        self.fill(n)?;
        let take = n.min(self.available());
        let out = self.buffer[self.pos..self.pos + take].to_vec();
        self.consume(take);
        Ok(out)
    }

    /// Returns the number of transformed bytes delivered so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the chunk size used when pulling from the source.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns `true` once the source and transform have both ended.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.available() == 0
    }

    /// Returns a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Consumes the reader and returns the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn available(&self) -> usize {
        self.buffer.len() - self.pos
    }

    fn consume(&mut self, n: usize) {
        self.pos += n;
        self.position += n as u64;
        if self.pos == self.buffer.len() {
            self.buffer.clear();
            self.pos = 0;
        } else if self.pos >= self.chunk_size.max(DEFAULT_CHUNK_SIZE) {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }
    }

    /// Pulls chunks until `n` bytes are buffered or the stream ends.
    fn fill(&mut self, n: usize) -> io::Result<()> {
        while self.available() < n && !self.exhausted {
            let got = read_full(&mut self.source, &mut self.chunk)?;
            if got == 0 {
                let tail = self.transform.finish()?;
                self.buffer.extend_from_slice(&tail);
                self.exhausted = true;
                break;
            }

            let out = self.transform.transform(&self.chunk[..got])?;
            if out.is_empty() && !self.transform.needs_input() {
                self.exhausted = true;
                break;
            }
            self.buffer.extend_from_slice(&out);
        }
        Ok(())
    }

    /// Discards up to `n` transformed bytes, returning how many were skipped.
    fn skip(&mut self, mut n: u64) -> io::Result<u64> {
        let mut skipped = 0;
        while n > 0 {
            let want = n.min(self.chunk_size.max(DEFAULT_CHUNK_SIZE) as u64) as usize;
            self.fill(want)?;
            let take = want.min(self.available());
            if take == 0 {
                break;
            }
            self.consume(take);
            skipped += take as u64;
            n -= take as u64;
        }
        Ok(skipped)
    }
}

impl<R: Read, T: ChunkTransform> Read for TransformReader<R, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.fill(buf.len())?;
        let take = buf.len().min(self.available());
        buf[..take].copy_from_slice(&self.buffer[self.pos..self.pos + take]);
        self.consume(take);
        Ok(take)
    }
}

/// Forward-only seeking.
///
/// Skipping past the end of the stream stops at the end, and the returned
/// position is where the reader actually is, not the requested offset.
/// Backward seeks and seeks from [`SeekFrom::End`] fail with
/// [`io::ErrorKind::Unsupported`].
impl<R: Read, T: ChunkTransform> Seek for TransformReader<R, T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) if offset >= self.position => offset,
            SeekFrom::Current(delta) if delta >= 0 => self.position.saturating_add(delta as u64),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "seeking backwards is not allowed",
                ));
            }
        };
        self.skip(target - self.position)?;
        Ok(self.position)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}
