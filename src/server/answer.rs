//! Response shapes. Every shape implements [`Answer`]; the connection
//! drives the shared emission protocol: status line, `Connection`
//! policy, the shape's headers, then either a sized stream
//! (`Content-Length`), generated content (chunked), or nothing
//! (`Content-Length:0`).

use crate::headers::AnswerHeaders;
use crate::stream::{Empty, InputStream, MemoryStream, OutputStream};
use crate::vault::NoViews;
use crate::{Code, Header, MimeType, Out, Result};

#[cfg(feature = "std")]
use crate::stream::FileStream;

pub trait Answer {
    type Stream: InputStream;

    fn code(&self) -> Code;

    /// Emit this shape's header lines (no terminating blank line).
    fn write_headers(&mut self, _out: &mut Out) -> Result<()> {
        Ok(())
    }

    /// Whether the shape already provides the given header itself, so
    /// the connection does not add its own.
    fn has_header(&self, _h: Header) -> bool {
        false
    }

    /// The body stream. `None` or a stream without content means an
    /// empty body; a stream with content but no size means generated
    /// content sent chunked via [`Answer::send_content`].
    fn take_stream(&mut self) -> Option<Self::Stream> {
        None
    }

    /// Produce content of unknown length. `tmp` is staging space from
    /// the connection buffer, `out` wraps each write in chunk framing.
    fn send_content(&mut self, _tmp: &mut [u8], _out: &mut dyn OutputStream) -> bool {
        true
    }
}

/// Status only, zero-length body.
pub struct CodeAnswer {
    code: Code,
}

impl CodeAnswer {
    pub fn new(code: Code) -> CodeAnswer {
        CodeAnswer { code }
    }
}

impl Answer for CodeAnswer {
    type Stream = Empty;

    fn code(&self) -> Code {
        self.code
    }

    fn take_stream(&mut self) -> Option<Empty> {
        None
    }
}

/// A fixed message with a Content-Type.
pub struct SimpleAnswer<'a> {
    code: Code,
    mime: MimeType,
    msg: &'a [u8],
}

impl<'a> SimpleAnswer<'a> {
    pub fn new(code: Code, mime: MimeType, msg: &'a [u8]) -> SimpleAnswer<'a> {
        SimpleAnswer { code, mime, msg }
    }
}

impl<'a> Answer for SimpleAnswer<'a> {
    type Stream = MemoryStream<'a>;

    fn code(&self) -> Code {
        self.code
    }

    fn write_headers(&mut self, out: &mut Out) -> Result<()> {
        out.write_bytes(b"Content-Type:")?;
        out.write_bytes(self.mime.as_str().as_bytes())?;
        out.write_bytes(b"\r\n")
    }

    fn take_stream(&mut self) -> Option<MemoryStream<'a>> {
        Some(MemoryStream::new(self.msg))
    }
}

/// Serves a file, Content-Type from the extension. A file that does not
/// open answers 404 with an empty body.
#[cfg(feature = "std")]
pub struct FileAnswer {
    code: Code,
    mime: Option<MimeType>,
    stream: Option<FileStream>,
}

#[cfg(feature = "std")]
impl FileAnswer {
    pub fn open(path: &str) -> FileAnswer {
        let stream = FileStream::open(path);
        if stream.has_content() {
            let ext = match path.rfind('.') {
                Some(i) => &path[i + 1..],
                None => "",
            };
            FileAnswer {
                code: Code::Ok,
                mime: Some(MimeType::from_extension(ext.as_bytes())),
                stream: Some(stream),
            }
        } else {
            FileAnswer {
                code: Code::NotFound,
                mime: None,
                stream: None,
            }
        }
    }
}

#[cfg(feature = "std")]
impl Answer for FileAnswer {
    type Stream = FileStream;

    fn code(&self) -> Code {
        self.code
    }

    fn write_headers(&mut self, out: &mut Out) -> Result<()> {
        if let Some(m) = self.mime {
            out.write_bytes(b"Content-Type:")?;
            out.write_bytes(m.as_str().as_bytes())?;
            out.write_bytes(b"\r\n")?;
        }
        Ok(())
    }

    fn take_stream(&mut self) -> Option<FileStream> {
        self.stream.take()
    }
}

/// An arbitrary header set and no body. Values are set before sending.
pub struct HeaderAnswer {
    code: Code,
    pub headers: AnswerHeaders,
}

impl HeaderAnswer {
    pub fn new(code: Code, declared: &[Header]) -> HeaderAnswer {
        HeaderAnswer {
            code,
            headers: AnswerHeaders::new(declared),
        }
    }
}

impl Answer for HeaderAnswer {
    type Stream = Empty;

    fn code(&self) -> Code {
        self.code
    }

    fn write_headers(&mut self, out: &mut Out) -> Result<()> {
        self.headers.write_all(&NoViews, out)
    }

    fn has_header(&self, h: Header) -> bool {
        self.headers.is_set(h)
    }

    fn take_stream(&mut self) -> Option<Empty> {
        None
    }
}

/// Wraps a generator callback; output is sent with chunked framing. The
/// callback fills the staging slice and returns how many bytes it
/// produced, 0 when done.
pub struct CaptureAnswer<F> {
    code: Code,
    pub headers: AnswerHeaders,
    f: F,
}

impl<F: FnMut(&mut [u8]) -> usize> CaptureAnswer<F> {
    pub fn new(code: Code, f: F) -> CaptureAnswer<F> {
        CaptureAnswer {
            code,
            headers: AnswerHeaders::new(&[]),
            f,
        }
    }

    pub fn with_headers(code: Code, declared: &[Header], f: F) -> CaptureAnswer<F> {
        CaptureAnswer {
            code,
            headers: AnswerHeaders::new(declared),
            f,
        }
    }
}

impl<F: FnMut(&mut [u8]) -> usize> Answer for CaptureAnswer<F> {
    type Stream = Empty;

    fn code(&self) -> Code {
        self.code
    }

    fn write_headers(&mut self, out: &mut Out) -> Result<()> {
        self.headers.write_all(&NoViews, out)
    }

    fn has_header(&self, h: Header) -> bool {
        self.headers.is_set(h)
    }

    fn take_stream(&mut self) -> Option<Empty> {
        Some(Empty)
    }

    fn send_content(&mut self, tmp: &mut [u8], out: &mut dyn OutputStream) -> bool {
        loop {
            let n = (self.f)(tmp);
            if n == 0 {
                return true;
            }
            if out.write(&tmp[..n]) != n {
                return false;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chunk::ChunkedWriter;

    #[test]
    fn simple_answer_headers() {
        let mut a = SimpleAnswer::new(Code::Ok, MimeType::ApplicationJson, b"{}");
        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        a.write_headers(&mut out).unwrap();
        assert_eq!(out.written(), b"Content-Type:application/json\r\n");

        let mut s = a.take_stream().unwrap();
        assert_eq!(s.size(), 2);
        let mut body = [0u8; 8];
        assert_eq!(s.read(&mut body), 2);
    }

    #[test]
    fn capture_answer_generates_chunks() {
        let mut pieces: &[&[u8]] = &[b"ab", b"cde"];
        let mut a = CaptureAnswer::new(Code::Ok, move |tmp: &mut [u8]| {
            let Some((first, rest)) = pieces.split_first() else {
                return 0;
            };
            pieces = rest;
            tmp[..first.len()].copy_from_slice(first);
            first.len()
        });

        let mut sink = [0u8; 64];
        let mut out = Out::wrap(&mut sink);
        let mut chunks = ChunkedWriter::new(&mut out);
        let mut tmp = [0u8; 16];
        assert!(a.send_content(&mut tmp, &mut chunks));
        assert!(chunks.finish());
        assert_eq!(out.written(), b"2\r\nab\r\n3\r\ncde\r\n0\r\n");
    }

    #[test]
    fn file_answer_missing_is_404() {
        let a = FileAnswer::open("/definitely/not/here.html");
        assert_eq!(a.code(), Code::NotFound);
    }

    #[test]
    fn file_answer_mime_from_extension() {
        let dir = std::env::temp_dir().join("wren-answer-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("page.html");
        std::fs::write(&path, b"<html></html>").unwrap();

        let mut a = FileAnswer::open(path.to_str().unwrap());
        assert_eq!(a.code(), Code::Ok);
        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        a.write_headers(&mut out).unwrap();
        assert_eq!(out.written(), b"Content-Type:text/html\r\n");

        let s = a.take_stream().unwrap();
        assert_eq!(s.size(), 13);
    }
}
