//! Byte stream traits shared by response shapes, body intake and the
//! client. Sized streams drive `Content-Length` emission; a stream that
//! has content but no size drives chunked transfer.

/// A pull source of bytes.
pub trait InputStream {
    /// Total number of bytes, or 0 when unknown up front.
    fn size(&self) -> usize;

    /// Whether any bytes are expected at all. `size() == 0` together
    /// with `has_content()` means "content of unknown length".
    fn has_content(&self) -> bool;

    /// Read into `buf`, returning 0 at end of stream or on error.
    fn read(&mut self, buf: &mut [u8]) -> usize;
}

/// A push sink of bytes.
pub trait OutputStream {
    /// Write `buf`, returning how many bytes were taken. Anything short
    /// of `buf.len()` is a failure for the caller.
    fn write(&mut self, buf: &[u8]) -> usize;
}

/// A borrowed in-memory stream.
pub struct MemoryStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemoryStream<'a> {
    pub fn new(data: &'a [u8]) -> MemoryStream<'a> {
        MemoryStream { data, pos: 0 }
    }
}

impl InputStream for MemoryStream<'_> {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn has_content(&self) -> bool {
        !self.data.is_empty()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = (self.data.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

/// No bytes of its own, but declares content: the marker for generated
/// (chunked) output.
pub struct Empty;

impl InputStream for Empty {
    fn size(&self) -> usize {
        0
    }

    fn has_content(&self) -> bool {
        true
    }

    fn read(&mut self, _buf: &mut [u8]) -> usize {
        0
    }
}

/// A file on disk. Opening is infallible; a missing file is a stream
/// without content, which the file answer turns into a 404.
#[cfg(feature = "std")]
pub struct FileStream {
    f: Option<std::fs::File>,
    size: usize,
}

#[cfg(feature = "std")]
impl FileStream {
    pub fn open(path: &str) -> FileStream {
        let f = std::fs::File::open(path).ok();
        let size = f
            .as_ref()
            .and_then(|f| f.metadata().ok())
            .map(|m| m.len() as usize)
            .unwrap_or(0);
        FileStream { f, size }
    }
}

#[cfg(feature = "std")]
impl InputStream for FileStream {
    fn size(&self) -> usize {
        self.size
    }

    fn has_content(&self) -> bool {
        self.f.is_some()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        use std::io::Read;
        match &mut self.f {
            Some(f) => f.read(buf).unwrap_or(0),
            None => 0,
        }
    }
}

impl OutputStream for crate::Out<'_> {
    fn write(&mut self, buf: &[u8]) -> usize {
        match self.write_bytes(buf) {
            Ok(()) => buf.len(),
            Err(_) => 0,
        }
    }
}

/// Pump `input` into `output` through the caller's staging buffer, up to
/// `limit` bytes. Returns how many bytes actually moved.
pub fn copy(
    input: &mut dyn InputStream,
    output: &mut dyn OutputStream,
    buf: &mut [u8],
    limit: usize,
) -> usize {
    let mut total = 0;
    loop {
        let want = (limit - total).min(buf.len());
        if want == 0 {
            return total;
        }
        let step = input.read(&mut buf[..want]);
        if step == 0 {
            return total;
        }
        let written = output.write(&buf[..step]);
        total += written;
        if written != step {
            return total;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Out;

    #[test]
    fn memory_stream_reads_in_steps() {
        let mut m = MemoryStream::new(b"abcdef");
        assert_eq!(m.size(), 6);
        let mut buf = [0u8; 4];
        assert_eq!(m.read(&mut buf), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(m.read(&mut buf), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(m.read(&mut buf), 0);
    }

    #[test]
    fn copy_respects_limit() {
        let mut m = MemoryStream::new(b"0123456789");
        let mut sink = [0u8; 32];
        let mut out = Out::wrap(&mut sink);
        let mut staging = [0u8; 3];
        let n = copy(&mut m, &mut out, &mut staging, 7);
        assert_eq!(n, 7);
        assert_eq!(out.written(), b"0123456");
    }

    #[test]
    fn empty_has_content_but_no_size() {
        let mut e = Empty;
        assert_eq!(e.size(), 0);
        assert!(e.has_content());
        assert_eq!(e.read(&mut [0u8; 8]), 0);
    }
}
