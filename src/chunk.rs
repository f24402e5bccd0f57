//! Chunked transfer coding: an incremental decoder for inbound bodies
//! and a writer wrapping any [`OutputStream`] for outbound ones.

use core::fmt::Write;

use crate::stream::OutputStream;
use crate::util::Span;
use crate::{Error, Out, Result};

/// Incremental chunked-body decoder. Feed it whatever input is on hand;
/// it consumes what it can and reports how much input and output moved.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dechunker {
    /// Expecting a `hex-size[;ext] CRLF` line.
    Size,
    /// Inside chunk data, this many bytes left.
    Data(usize),
    /// Expecting the CRLF closing a chunk.
    CrLf,
    /// Saw the terminating zero-size chunk.
    Done,
}

impl Dechunker {
    pub fn new() -> Self {
        Dechunker::Size
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Dechunker::Done)
    }

    /// Decode as much of `src` into `dst` as possible. Returns
    /// `(input consumed, output produced)`; both 0 means more input is
    /// needed (or the body is done).
    pub fn parse_input(&mut self, src: &[u8], dst: &mut [u8]) -> Result<(usize, usize)> {
        let mut used = 0;
        let mut produced = 0;

        loop {
            let progressed = match *self {
                Dechunker::Size => self.read_size(src, &mut used)?,
                Dechunker::Data(_) => self.read_data(src, dst, &mut used, &mut produced),
                Dechunker::CrLf => self.read_crlf(src, &mut used)?,
                Dechunker::Done => false,
            };
            if !progressed {
                return Ok((used, produced));
            }
        }
    }

    fn read_size(&mut self, src: &[u8], used: &mut usize) -> Result<bool> {
        let mut span = Span::of(*used..src.len());
        let Some(eol) = span.find(src, b"\r\n") else {
            return Ok(false);
        };
        let mut line = span.split_at(eol);
        // Chunk extensions after ';' are ignored.
        let size = line.split_upto(src, b";");
        let len = size.parse_hex(src).ok_or(Error::BadChunk)? as usize;

        *used += eol + 2;
        *self = if len == 0 {
            Dechunker::Done
        } else {
            Dechunker::Data(len)
        };
        Ok(true)
    }

    fn read_data(&mut self, src: &[u8], dst: &mut [u8], used: &mut usize, produced: &mut usize) -> bool {
        let Dechunker::Data(left) = self else {
            unreachable!();
        };
        let take = (src.len() - *used).min(dst.len() - *produced).min(*left);
        dst[*produced..*produced + take].copy_from_slice(&src[*used..*used + take]);
        *used += take;
        *produced += take;
        *left -= take;
        if *left == 0 {
            *self = Dechunker::CrLf;
        }
        take > 0
    }

    fn read_crlf(&mut self, src: &[u8], used: &mut usize) -> Result<bool> {
        let rest = &src[*used..];
        if rest.len() < 2 {
            return Ok(false);
        }
        if &rest[..2] != b"\r\n" {
            return Err(Error::BadChunk);
        }
        *used += 2;
        *self = Dechunker::Size;
        Ok(true)
    }
}

impl Default for Dechunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps chunk framing around an [`OutputStream`]: every write becomes
/// `hex-size CRLF bytes CRLF` (lowercase hex), [`ChunkedWriter::finish`]
/// closes the body with the zero chunk.
pub struct ChunkedWriter<'a> {
    out: &'a mut dyn OutputStream,
}

impl<'a> ChunkedWriter<'a> {
    pub fn new(out: &'a mut dyn OutputStream) -> ChunkedWriter<'a> {
        ChunkedWriter { out }
    }

    pub fn write_chunk(&mut self, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return true;
        }
        let mut prefix = [0u8; 18];
        let mut out = Out::wrap(&mut prefix);
        if write!(out.writer(), "{:x}\r\n", bytes.len()).is_err() {
            return false;
        }
        let head = out.written();
        self.out.write(head) == head.len()
            && self.out.write(bytes) == bytes.len()
            && self.out.write(b"\r\n") == 2
    }

    pub fn finish(&mut self) -> bool {
        self.out.write(b"0\r\n") == 3
    }
}

impl OutputStream for ChunkedWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> usize {
        if self.write_chunk(buf) {
            buf.len()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Out;

    #[test]
    fn dechunk_size_needs_full_line() {
        let mut d = Dechunker::new();
        let mut b = [0u8; 64];
        assert_eq!(d.parse_input(b"", &mut b).unwrap(), (0, 0));
        assert_eq!(d.parse_input(b"2", &mut b).unwrap(), (0, 0));
        assert_eq!(d.parse_input(b"2\r", &mut b).unwrap(), (0, 0));
        assert_eq!(d.parse_input(b"2\r\n", &mut b).unwrap(), (3, 0));
        assert_eq!(d, Dechunker::Data(2));
    }

    #[test]
    fn dechunk_ignores_extensions() {
        let mut d = Dechunker::new();
        let mut b = [0u8; 64];
        assert_eq!(d.parse_input(b"2;meta=1\r", &mut b).unwrap(), (0, 0));
        assert_eq!(d.parse_input(b"2;meta=1\r\n", &mut b).unwrap(), (10, 0));
    }

    #[test]
    fn dechunk_data_and_end() {
        let mut d = Dechunker::new();
        let mut b = [0u8; 64];
        assert_eq!(d.parse_input(b"2\r\nOK", &mut b).unwrap(), (5, 2));
        assert_eq!(&b[..2], b"OK");
        assert_eq!(d.parse_input(b"\r\n", &mut b).unwrap(), (2, 0));
        assert!(!d.is_done());
        assert_eq!(d.parse_input(b"0\r\n", &mut b).unwrap(), (3, 0));
        assert!(d.is_done());
    }

    #[test]
    fn dechunk_whole_body_at_once() {
        let mut d = Dechunker::new();
        let mut b = [0u8; 64];
        let (used, produced) = d.parse_input(b"2\r\nab\r\n3\r\ncde\r\n0\r\n", &mut b).unwrap();
        assert_eq!(used, 18);
        assert_eq!(produced, 5);
        assert_eq!(&b[..5], b"abcde");
        assert!(d.is_done());
    }

    #[test]
    fn dechunk_rejects_bad_size() {
        let mut d = Dechunker::new();
        let mut b = [0u8; 8];
        assert_eq!(d.parse_input(b"zz\r\n", &mut b), Err(Error::BadChunk));
    }

    #[test]
    fn dechunk_rejects_missing_crlf() {
        let mut d = Dechunker::new();
        let mut b = [0u8; 8];
        assert_eq!(d.parse_input(b"1\r\nxYY", &mut b), Err(Error::BadChunk));
    }

    #[test]
    fn writer_frames_chunks() {
        let mut sink = [0u8; 64];
        let mut out = Out::wrap(&mut sink);
        let mut w = ChunkedWriter::new(&mut out);
        assert!(w.write_chunk(b"ab"));
        assert!(w.write_chunk(b"cde"));
        assert!(w.finish());
        assert_eq!(out.written(), b"2\r\nab\r\n3\r\ncde\r\n0\r\n");
    }
}
