//! Request line parsing: `METHOD SP request-target SP HTTP/1.x CRLF`,
//! plus the shared header-line splitter and query string helpers.

use crate::proto::method::Method;
use crate::proto::Parsing;
use crate::util::Span;
use crate::vault::{Scratch, TransientVault, View};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

/// The request-target. Only origin-form (absolute path plus optional
/// query) and the asterisk-form `*` occur on a server; the stored view
/// covers the whole target including the query.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestUri {
    pub absolute_path: View,
}

impl RequestUri {
    /// `*` means the request applies to the server, not a resource.
    pub fn applies_to_all(&self, target: &[u8]) -> bool {
        target == b"*"
    }

    pub fn persist<const N: usize>(
        &mut self,
        vault: &mut TransientVault<N>,
        future_drop: usize,
    ) -> bool {
        vault.persist_view(&mut self.absolute_path, future_drop)
    }
}

/// The path part of a target, without the query.
pub fn only_path(target: &[u8]) -> &[u8] {
    match target.iter().position(|c| *c == b'?') {
        Some(q) => &target[..q],
        None => target,
    }
}

/// The query part of a target (after `?`), empty when absent.
pub fn query_of(target: &[u8]) -> &[u8] {
    match target.iter().position(|c| *c == b'?') {
        Some(q) => &target[q + 1..],
        None => &[],
    }
}

/// `key[=value]&...` accessors over a borrowed query string.
#[derive(Clone, Copy)]
pub struct Query<'a> {
    raw: &'a [u8],
}

impl<'a> Query<'a> {
    pub fn new(raw: &'a [u8]) -> Query<'a> {
        Query { raw }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn value_for(&self, key: &[u8]) -> Option<&'a [u8]> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> QueryIter<'a> {
        QueryIter {
            raw: self.raw,
            pos: 0,
        }
    }
}

pub struct QueryIter<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for QueryIter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.raw.len() {
            return None;
        }
        let rest = &self.raw[self.pos..];
        let end = rest
            .iter()
            .position(|c| *c == b'&')
            .unwrap_or(rest.len());
        let pair = &rest[..end];
        self.pos += end + 1;
        match pair.iter().position(|c| *c == b'=') {
            Some(eq) => Some((&pair[..eq], &pair[eq + 1..])),
            None => Some((pair, &[][..])),
        }
    }
}

/// `METHOD SP request-target SP HTTP/1.{0|1} CRLF`.
#[derive(Debug, Default)]
pub struct RequestLine {
    pub method: Option<Method>,
    pub uri: RequestUri,
    pub version: Option<HttpVersion>,
}

impl RequestLine {
    pub fn new() -> RequestLine {
        RequestLine::default()
    }

    /// Parse one request line off the front of `input`. On success the
    /// input is consumed past the CRLF and header parsing may begin.
    pub fn parse(&mut self, s: &Scratch<'_>, input: &mut Span) -> Result<Parsing> {
        let b = s.bytes();

        let m = input.split_upto(b, b" ");
        self.method = Method::from_bytes(m.slice(b));
        if self.method.is_none() {
            return Err(Error::InvalidRequest);
        }

        *input = input.trim_left(b, b' ');
        let uri = input.split_upto(b, b" ");
        if uri.is_empty() || input.is_empty() {
            return Err(Error::InvalidRequest);
        }
        self.uri.absolute_path = s.view(uri);

        *input = input.trim_left(b, b' ');
        let proto = input.split_upto(b, b"/1.");
        if proto.slice(b) != b"HTTP" || input.len() < 3 {
            return Err(Error::InvalidRequest);
        }
        let rest = input.slice(b);
        self.version = match rest[0] {
            b'0' => Some(HttpVersion::Http10),
            b'1' => Some(HttpVersion::Http11),
            _ => return Err(Error::InvalidRequest),
        };
        if rest[1] != b'\r' || rest[2] != b'\n' {
            return Err(Error::InvalidRequest);
        }
        input.split_at(3);

        Ok(Parsing::MoreData)
    }

    pub fn persist<const N: usize>(
        &mut self,
        vault: &mut TransientVault<N>,
        future_drop: usize,
    ) -> bool {
        self.uri.persist(vault, future_drop)
    }

    pub fn reset(&mut self) {
        *self = RequestLine::default();
    }
}

/// One line of the header block.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HeaderLine {
    /// `name ":" [SP] value CRLF`, both parts trimmed.
    Field { name: Span, value: Span },
    /// The empty line ending the block (consumed).
    End,
    /// No CRLF in the remaining input, refill needed.
    Incomplete,
}

/// Split the next header line off `input`. `Field` and `End` consume
/// their bytes including the CRLF; `Incomplete` consumes nothing.
pub(crate) fn next_header_line(b: &[u8], input: &mut Span) -> Result<HeaderLine> {
    if input.starts_with(b, b"\r\n") {
        input.split_at(2);
        return Ok(HeaderLine::End);
    }
    let Some(eol) = input.find(b, b"\r\n") else {
        return Ok(HeaderLine::Incomplete);
    };
    let mut line = input.split_at(eol);
    input.split_at(2);

    if line.find(b, b":").is_none() {
        return Err(Error::InvalidRequest);
    }
    let name = line.split_upto(b, b":").trim(b, b' ');
    let value = line.trim(b, b' ');
    Ok(HeaderLine::Field { name, value })
}

#[cfg(test)]
mod test {
    use super::*;

    fn scratch_of(bytes: &[u8]) -> (Scratch<'_>, Span) {
        (Scratch { bytes, gen: 0 }, Span::of(0..bytes.len()))
    }

    #[test]
    fn parse_request_line() {
        let b = b"GET /some/path?x=1 HTTP/1.1\r\nHost: foo\r\n";
        let (s, mut input) = scratch_of(b);
        let mut line = RequestLine::new();
        assert_eq!(line.parse(&s, &mut input), Ok(Parsing::MoreData));
        assert_eq!(line.method, Some(Method::Get));
        assert_eq!(line.version, Some(HttpVersion::Http11));
        assert_eq!(input.slice(b), b"Host: foo\r\n");

        let target = s.bytes();
        let View::Scratch { off, len, .. } = line.uri.absolute_path else {
            panic!()
        };
        let target = &target[off as usize..(off + len) as usize];
        assert_eq!(only_path(target), b"/some/path");
        assert_eq!(query_of(target), b"x=1");
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in [
            &b"BREW / HTTP/1.1\r\n"[..],
            &b"GET  HTTP/1.1\r\n"[..],
            &b"GET / HTTP/2.0\r\n"[..],
            &b"GET / HTTP/1.2\r\n"[..],
            &b"GET / HTTP/1.1\n"[..],
        ] {
            let (s, mut input) = scratch_of(bad);
            let mut line = RequestLine::new();
            assert_eq!(
                line.parse(&s, &mut input),
                Err(Error::InvalidRequest),
                "{:?}",
                core::str::from_utf8(bad)
            );
        }
    }

    #[test]
    fn http_10_accepted() {
        let (s, mut input) = scratch_of(b"HEAD / HTTP/1.0\r\n");
        let mut line = RequestLine::new();
        line.parse(&s, &mut input).unwrap();
        assert_eq!(line.version, Some(HttpVersion::Http10));
        assert_eq!(line.method, Some(Method::Head));
    }

    #[test]
    fn header_lines() {
        let b = b"Host: foo \r\nX: y\r\n\r\ntail";
        let mut input = Span::of(0..b.len());

        let HeaderLine::Field { name, value } = next_header_line(b, &mut input).unwrap() else {
            panic!()
        };
        assert_eq!(name.slice(b), b"Host");
        assert_eq!(value.slice(b), b"foo");

        let HeaderLine::Field { name, value } = next_header_line(b, &mut input).unwrap() else {
            panic!()
        };
        assert_eq!(name.slice(b), b"X");
        assert_eq!(value.slice(b), b"y");

        assert_eq!(next_header_line(b, &mut input).unwrap(), HeaderLine::End);
        assert_eq!(input.slice(b), b"tail");
    }

    #[test]
    fn header_line_incomplete_and_bad() {
        let b = b"Host: fo";
        let mut input = Span::of(0..b.len());
        assert_eq!(
            next_header_line(b, &mut input).unwrap(),
            HeaderLine::Incomplete
        );
        assert_eq!(input.slice(b), b"Host: fo");

        let b = b"no colon here\r\n";
        let mut input = Span::of(0..b.len());
        assert_eq!(next_header_line(b, &mut input), Err(Error::InvalidRequest));
    }

    #[test]
    fn query_iteration() {
        let q = Query::new(b"a=1&b&c=three");
        let mut it = q.iter();
        assert_eq!(it.next(), Some((&b"a"[..], &b"1"[..])));
        assert_eq!(it.next(), Some((&b"b"[..], &b""[..])));
        assert_eq!(it.next(), Some((&b"c"[..], &b"three"[..])));
        assert_eq!(it.next(), None);

        assert_eq!(q.value_for(b"c"), Some(&b"three"[..]));
        assert_eq!(q.value_for(b"missing"), None);
    }
}
