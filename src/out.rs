use core::fmt::{self, Write};

use crate::{Error, Result};

/// Bounded writer over a borrowed byte slice.
///
/// Used wherever response text is assembled before hitting the transport:
/// status lines, header blocks built in the free region of the connection
/// buffer, chunk prefixes. A write that does not fit fails without
/// committing anything.
pub struct Out<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Out<'a> {
    pub fn wrap(buf: &'a mut [u8]) -> Self {
        Out { buf, pos: 0 }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.buf.len() - self.pos {
            return Err(Error::OutputOverflow);
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    pub fn flush(self) -> &'a [u8] {
        &self.buf[..self.pos]
    }

    /// A `core::fmt::Write` adapter. Writes that overflow poison the
    /// adapter; nothing partial is committed back to the `Out`.
    pub fn writer<'b>(&'b mut self) -> Writer<'b, 'a> {
        Writer {
            out: self,
            inc: Some(0),
        }
    }
}

pub struct Writer<'b, 'a> {
    out: &'b mut Out<'a>,
    inc: Option<usize>,
}

impl<'b, 'a> Writer<'b, 'a> {
    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(inc) = self.inc else {
            return Err(Error::OutputOverflow);
        };
        let pos = self.out.pos + inc;
        if bytes.len() > self.out.buf.len() - pos {
            // Do not commit anything written so far.
            self.inc = None;
            return Err(Error::OutputOverflow);
        }
        self.out.buf[pos..pos + bytes.len()].copy_from_slice(bytes);
        self.inc = Some(inc + bytes.len());
        Ok(())
    }
}

impl<'b, 'a> fmt::Write for Writer<'b, 'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl<'b, 'a> Drop for Writer<'b, 'a> {
    fn drop(&mut self) {
        if let Some(inc) = self.inc.take() {
            // Commit increase to the borrowed Out.
            self.out.pos += inc;
        }
    }
}
