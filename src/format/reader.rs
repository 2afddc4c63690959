//! Low-level line reading utilities for header and envelope parsing.

use std::io::{self, Read};

/// Outcome of reading one bounded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A complete line, newline included.
    Complete(Vec<u8>),
    /// The source ended before a newline; holds whatever was read.
    Eof(Vec<u8>),
    /// The limit was reached without seeing a newline.
    TooLong,
}

/// Reads bytes up to and including the next `\n`, at most `limit` bytes.
///
/// Reads one byte at a time so the source is never advanced past the
/// newline. Callers rely on the stream position afterwards to locate the
/// payload, so this must not be replaced by a buffered reader.
///
/// # Errors
///
/// Returns any I/O error from the underlying reader other than
/// [`io::ErrorKind::Interrupted`], which is retried.
pub fn read_line<R: Read + ?Sized>(r: &mut R, limit: usize) -> io::Result<Line> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while line.len() < limit {
        match r.read(&mut byte) {
            Ok(0) => return Ok(Line::Eof(line)),
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    return Ok(Line::Complete(line));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(Line::TooLong)
}

/// Returns the line with surrounding ASCII whitespace removed.
pub fn trimmed(line: &[u8]) -> &[u8] {
    line.trim_ascii()
}

/// Renders raw line bytes for error messages.
pub fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(trimmed(line)).into_owned()
}

/// Reads exactly `buf.len()` bytes unless the source ends first.
///
/// Returns the number of bytes read; a short count means end of stream.
pub fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
