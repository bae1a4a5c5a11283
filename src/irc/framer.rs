//! Line framing for the IRC byte stream.
//!
//! Splits incoming bytes on `\r\n` (a bare `\n` is tolerated, servers in the
//! wild send it), keeps any trailing partial line buffered for the next read,
//! and refuses to buffer more than `max_len` bytes of a single line.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::error::{ConnectionError, FramingError};

/// Default line limit. RFC 2812 says 512 bytes, IRCv3 tags push it to 8191.
pub const MAX_LINE_LEN: usize = 8191;

/// Incremental line splitter.
///
/// Usable directly through [`LineFramer::feed`] or as a tokio codec inside
/// `Framed`, which is how the connection driver reads the socket.
#[derive(Debug)]
pub struct LineFramer {
    max_len: usize,
    /// Index of the next byte to scan for `\n`.
    next_index: usize,
    /// Partial data held between [`feed`](Self::feed) calls.
    buffer: BytesMut,
    /// Skipping the rest of an oversized line.
    discarding: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(MAX_LINE_LEN)
    }
}

impl LineFramer {
    /// `max_len` bounds a single line including its terminator.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            next_index: 0,
            buffer: BytesMut::new(),
            discarding: false,
        }
    }

    /// Append a chunk and iterate over every line it completes.
    ///
    /// Lines not drained from the iterator stay buffered and come out of the
    /// next call. An oversized line yields one [`FramingError`] and is
    /// skipped up to its terminator; the lines after it are unaffected.
    pub fn feed(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(chunk);
        Lines { framer: self }
    }

    /// Number of bytes of unterminated data currently held.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn decode_line(&mut self, src: &mut BytesMut) -> Result<Option<String>, FramingError> {
        loop {
            let newline = src[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.discarding, newline) {
                (true, Some(index)) => {
                    // Tail of a line already reported as too long.
                    let _ = src.split_to(index + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    src.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(index)) => {
                    let end = index + 1;
                    self.next_index = 0;

                    let mut line = src.split_to(end);
                    if end > self.max_len {
                        return Err(FramingError::LineTooLong {
                            limit: self.max_len,
                            buffered: end,
                        });
                    }

                    line.truncate(end - 1);
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }
                    return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
                }
                (false, None) => {
                    if src.len() > self.max_len {
                        let buffered = src.len();
                        src.clear();
                        self.next_index = 0;
                        self.discarding = true;
                        return Err(FramingError::LineTooLong {
                            limit: self.max_len,
                            buffered,
                        });
                    }
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }
}

/// Lines completed by one [`LineFramer::feed`] call.
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = Result<String, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = std::mem::take(&mut self.framer.buffer);
        let line = self.framer.decode_line(&mut buffer);
        self.framer.buffer = buffer;
        line.transpose()
    }
}

impl Decoder for LineFramer {
    type Item = String;
    type Error = ConnectionError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ConnectionError> {
        Ok(self.decode_line(src)?)
    }
}

impl Encoder<String> for LineFramer {
    type Error = ConnectionError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ConnectionError> {
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
