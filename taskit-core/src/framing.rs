//! The "First Bytes" long-message transfer protocol.
//!
//! Carries an arbitrary-length UTF-8 payload over a blocking stream socket as
//! one or more length-delimited segments, without either side needing to know
//! the total payload size up front. See `spec.md` §4.1 for the wire format.

use std::io::{self, Read, Write};

use crate::error::FramingError;

/// Maximum number of bytes a single segment's `data` field may carry. This is
/// a hard ceiling imposed by the 4 hex-digit size field (`0xffff`).
pub const MAX_SEGMENT_SIZE: usize = 0xFFFF;

/// Default chunk size used when neither side configures one explicitly.
pub const DEFAULT_DATA_SIZE: usize = 2048;

const HEADER_LEN: usize = 5;

/// Chunks and reassembles payloads using the First Bytes wire format.
///
/// `data_size` bounds the size of every non-final segment; the final segment
/// carries whatever remains (at least one byte, unless the payload itself is
/// empty, in which case a single zero-length final segment is sent).
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    data_size: usize,
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new(DEFAULT_DATA_SIZE)
    }
}

impl Frame {
    /// Construct a framer with the given chunk size. Panics if `data_size` is
    /// zero or exceeds [`MAX_SEGMENT_SIZE`]; this is a programmer error, not a
    /// runtime condition, so unlike the protocol's own corruption checks it is
    /// not modeled as a `Result`.
    pub fn new(data_size: usize) -> Self {
        assert!(data_size > 0, "data_size must be positive");
        assert!(
            data_size <= MAX_SEGMENT_SIZE,
            "data_size {data_size} exceeds the 4 hex-digit size field width"
        );
        Frame { data_size }
    }

    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Set the chunk size used by subsequent `send` calls.
    pub fn set_data_size(&mut self, data_size: usize) {
        *self = Frame::new(data_size);
    }

    /// Write `payload` to `stream` as one or more segments. Uses write-all
    /// semantics: a short write is never observed by the caller, only a
    /// terminal `io::Error`.
    pub fn send<W: Write>(&self, stream: &mut W, payload: &[u8]) -> io::Result<()> {
        let mut remaining = payload;
        loop {
            let take = remaining.len().min(self.data_size);
            let (chunk, rest) = remaining.split_at(take);
            let continuation = if !rest.is_empty() { b'1' } else { b'0' };

            let mut header = [0u8; HEADER_LEN];
            header[0] = continuation;
            header[1..].copy_from_slice(hex4(chunk.len()).as_bytes());

            stream.write_all(&header)?;
            stream.write_all(chunk)?;

            if rest.is_empty() {
                return Ok(());
            }
            remaining = rest;
        }
    }

    /// Read one complete payload from `stream`, blocking until either the
    /// final segment has arrived or an error occurs.
    pub fn recv<R: Read>(&self, stream: &mut R) -> Result<Vec<u8>, FramingError> {
        let mut accumulator = Vec::new();
        loop {
            let mut header = [0u8; HEADER_LEN];
            read_exact_or_corrupt(stream, &mut header)?;

            let continuation = header[0];
            if continuation != b'0' && continuation != b'1' {
                return Err(FramingError::Corruption);
            }

            let size = parse_hex4(&header[1..]).ok_or(FramingError::Corruption)?;

            let mut chunk = vec![0u8; size];
            read_exact_or_corrupt(stream, &mut chunk)?;
            accumulator.extend_from_slice(&chunk);

            if continuation == b'0' {
                return Ok(accumulator);
            }
        }
    }
}

/// Reads exactly `buf.len()` bytes, treating a zero-length read as a
/// [`FramingError::Corruption`] rather than a generic I/O error — a broken
/// peer mid-segment is a protocol violation, not merely an unexpected EOF.
fn read_exact_or_corrupt<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<(), FramingError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).map_err(FramingError::Io)?;
        if n == 0 {
            return Err(FramingError::Corruption);
        }
        filled += n;
    }
    Ok(())
}

fn hex4(size: usize) -> String {
    format!("{size:04x}")
}

fn parse_hex4(digits: &[u8]) -> Option<usize> {
    if digits.len() != 4 {
        return None;
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| usize::from_str_radix(s, 16).ok())
}
