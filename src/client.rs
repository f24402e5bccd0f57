//! The companion HTTP client. It reuses the server's vocabulary, typed
//! header values and buffer: one [`TransientVault`] carries the request
//! head out and the response back in, and the caller observes the
//! response through a [`ResponseSink`].

use core::fmt::Write as _;
use std::io::Write as _;

use log::{debug, trace};

use crate::chunk::Dechunker;
use crate::headers::HeaderSet;
use crate::net::{Recv, TcpTransport, Transport};
use crate::proto::token::Encoding;
use crate::stream::{InputStream, OutputStream};
use crate::util::Span;
use crate::{Header, Method, MimeType, Out, TransientVault};

/// Longest URL the client can follow a redirect to.
const MAX_URL: usize = 512;

/// Headers the client itself parses out of a response.
const INTEREST: &[Header] = &[
    Header::ContentType,
    Header::ContentLength,
    Header::TransferEncoding,
    Header::ContentEncoding,
    Header::WwwAuthenticate,
];

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("bad url: {0}")]
    BadUrl(&'static str),
    #[error("connect or send failed")]
    Unavailable,
    #[error("redirect or retry budget exhausted")]
    OutOfRetries,
    #[error("response content encoding is not identity")]
    ContentEncoding,
    #[error("malformed or oversized response")]
    BadResponse,
    #[error("request body needs a known size")]
    BodyNeedsSize,
    #[error("request head did not fit the buffer")]
    RequestTooLarge,
    #[error("sink aborted the transfer")]
    Aborted,
}

/// What the caller gets to see of a response. Headers are delivered for
/// every recognized name; the body arrives in decoded pieces.
pub trait ResponseSink {
    fn status(&mut self, _code: u16) {}

    fn header(&mut self, _h: Header, _value: &[u8]) {}

    /// One decoded body piece. Return false to abort the transfer.
    fn body(&mut self, chunk: &[u8]) -> bool;
}

/// Sink that funnels the body into an [`OutputStream`].
pub struct BodyTo<'a> {
    pub out: &'a mut dyn OutputStream,
}

impl ResponseSink for BodyTo<'_> {
    fn body(&mut self, chunk: &[u8]) -> bool {
        self.out.write(chunk) == chunk.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlScheme {
    Http,
    Https,
}

/// A request to send. Additional headers are written as given.
pub struct HttpRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
}

/// A request body: its media type and a sized stream.
pub struct BodySource<'a> {
    pub mime: MimeType,
    pub stream: &'a mut dyn InputStream,
}

struct UrlParts<'a> {
    scheme: UrlScheme,
    host: &'a str,
    port: u16,
    path: &'a str,
}

fn split_url(url: &str) -> Result<UrlParts<'_>, ClientError> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or(ClientError::BadUrl("missing scheme"))?;
    let (scheme, default_port) = match scheme {
        "http" => (UrlScheme::Http, 80),
        "https" => (UrlScheme::Https, 443),
        _ => return Err(ClientError::BadUrl("unsupported scheme")),
    };
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    // Credentials embedded in the URL are refused outright.
    if authority.contains('@') {
        return Err(ClientError::BadUrl("userinfo not supported"));
    }
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => (
            h,
            p.parse::<u16>()
                .map_err(|_| ClientError::BadUrl("port not a number"))?,
        ),
        None => (authority, default_port),
    };
    if host.is_empty() {
        return Err(ClientError::BadUrl("empty host"));
    }
    Ok(UrlParts {
        scheme,
        host,
        port,
        path,
    })
}

enum Outcome {
    Final(u16),
    Redirect(u16),
    Auth,
}

/// The client proper. One instance holds one buffer and can be reused
/// across requests.
pub struct HttpClient<const N: usize = 1024> {
    buf: TransientVault<N>,
    url: [u8; MAX_URL],
    url_len: usize,
}

impl<const N: usize> Default for HttpClient<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HttpClient<N> {
    pub fn new() -> HttpClient<N> {
        HttpClient {
            buf: TransientVault::new(),
            url: [0; MAX_URL],
            url_len: 0,
        }
    }

    /// Send a request and stream the response into `sink`. Follows
    /// `Location` on 301/302/307 (up to 3 hops, bodyless requests
    /// only); a 401 consumes a retry as the hook for future
    /// authentication support.
    pub fn send<T: Transport, S: ResponseSink>(
        &mut self,
        req: &HttpRequest<'_>,
        mut body: Option<BodySource<'_>>,
        connect: &mut dyn FnMut(UrlScheme, &str, u16) -> Result<T, ClientError>,
        sink: &mut S,
    ) -> Result<u16, ClientError> {
        if req.url.len() > MAX_URL {
            return Err(ClientError::BadUrl("url too long"));
        }
        self.url[..req.url.len()].copy_from_slice(req.url.as_bytes());
        self.url_len = req.url.len();

        let mut retries = 3;
        loop {
            let mut current = [0u8; MAX_URL];
            current[..self.url_len].copy_from_slice(&self.url[..self.url_len]);
            let url = core::str::from_utf8(&current[..self.url_len])
                .map_err(|_| ClientError::BadUrl("not utf-8"))?;

            match self.send_once(url, req, body.as_mut(), connect, sink)? {
                Outcome::Final(code) => return Ok(code),
                Outcome::Redirect(code) => {
                    if body.is_some() {
                        // The body stream cannot be replayed; hand the
                        // redirect back to the caller instead.
                        return Ok(code);
                    }
                    debug!("redirect {} -> {:?}", code, core::str::from_utf8(&self.url[..self.url_len]));
                    retries -= 1;
                    if retries == 0 {
                        return Err(ClientError::OutOfRetries);
                    }
                }
                Outcome::Auth => {
                    retries -= 1;
                    if retries == 0 {
                        return Err(ClientError::OutOfRetries);
                    }
                }
            }
        }
    }

    fn send_once<T: Transport, S: ResponseSink>(
        &mut self,
        url: &str,
        req: &HttpRequest<'_>,
        body: Option<&mut BodySource<'_>>,
        connect: &mut dyn FnMut(UrlScheme, &str, u16) -> Result<T, ClientError>,
        sink: &mut S,
    ) -> Result<Outcome, ClientError> {
        let parts = split_url(url)?;
        let mut t = connect(parts.scheme, parts.host, parts.port)?;

        self.write_request(&mut t, &parts, req, body)?;

        // Receive the whole response head into the scratch area.
        self.buf.reset();
        let head_len = loop {
            let found = {
                let s = self.buf.scratch();
                Span::of(0..s.len()).find(s.bytes(), b"\r\n\r\n")
            };
            if let Some(i) = found {
                break i + 4;
            }
            if self.buf.free() == 0 {
                return Err(ClientError::BadResponse);
            }
            match t.recv(self.buf.tail()) {
                Ok(Recv::Data(n)) => self.buf.stored(n),
                Ok(Recv::Idle) | Ok(Recv::Closed) => return Err(ClientError::BadResponse),
                Err(_) => return Err(ClientError::Unavailable),
            }
        };

        let mut interest = HeaderSet::of(INTEREST);
        let mut location: Option<([u8; MAX_URL], usize)> = None;

        let code = {
            let s = self.buf.scratch();
            let bytes = s.bytes();

            let mut parsed = [httparse::EMPTY_HEADER; 32];
            let mut res = httparse::Response::new(&mut parsed);
            match res.parse(bytes) {
                Ok(httparse::Status::Complete(_)) => {}
                _ => return Err(ClientError::BadResponse),
            }
            let code = res.code.ok_or(ClientError::BadResponse)?;
            trace!("response status {}", code);
            sink.status(code);

            let base = bytes.as_ptr() as usize;
            for h in res.headers.iter() {
                let Some(known) = Header::from_bytes(h.name.as_bytes()) else {
                    continue;
                };
                sink.header(known, h.value);
                if known == Header::Location {
                    if h.value.len() <= MAX_URL {
                        let mut loc = [0u8; MAX_URL];
                        loc[..h.value.len()].copy_from_slice(h.value);
                        location = Some((loc, h.value.len()));
                    }
                    continue;
                }
                // Values are parsed in place; names outside the
                // interest set simply bounce off.
                let off = h.value.as_ptr() as usize - base;
                let mut span = Span::of(off..off + h.value.len());
                let _ = interest.accept_and_parse(h.name.as_bytes(), &s, &mut span);
            }
            code
        };

        if matches!(code, 301 | 302 | 307) {
            if let Some((loc, n)) = location {
                core::str::from_utf8(&loc[..n]).map_err(|_| ClientError::BadUrl("not utf-8"))?;
                self.url[..n].copy_from_slice(&loc[..n]);
                self.url_len = n;
                return Ok(Outcome::Redirect(code));
            }
        }
        if code == 401 {
            return Ok(Outcome::Auth);
        }

        self.buf.drop_front(head_len);
        self.read_body(&mut t, &interest, sink)?;
        Ok(Outcome::Final(code))
    }

    fn write_request<T: Transport>(
        &mut self,
        t: &mut T,
        parts: &UrlParts<'_>,
        req: &HttpRequest<'_>,
        body: Option<&mut BodySource<'_>>,
    ) -> Result<(), ClientError> {
        self.buf.reset();
        let head_len = {
            let mut out = Out::wrap(self.buf.tail());
            let mut w = out.writer();
            write!(
                w,
                "{} {} HTTP/1.1\r\nHost:{}\r\n",
                req.method.as_str(),
                parts.path,
                parts.host
            )
            .map_err(|_| ClientError::RequestTooLarge)?;
            for (name, value) in req.headers {
                write!(w, "{}:{}\r\n", name, value).map_err(|_| ClientError::RequestTooLarge)?;
            }
            // Until compressed responses are handled, ask for none.
            write!(w, "Accept-Encoding:identity\r\n").map_err(|_| ClientError::RequestTooLarge)?;
            match &body {
                Some(b) => {
                    let size = b.stream.size();
                    if size == 0 {
                        return Err(ClientError::BodyNeedsSize);
                    }
                    write!(
                        w,
                        "Content-Type:{}\r\nContent-Length:{}\r\n\r\n",
                        b.mime.as_str(),
                        size
                    )
                    .map_err(|_| ClientError::RequestTooLarge)?;
                }
                None => {
                    write!(w, "\r\n").map_err(|_| ClientError::RequestTooLarge)?;
                }
            }
            drop(w);
            out.len()
        };
        t.write_all(self.buf.staged(head_len))
            .map_err(|_| ClientError::Unavailable)?;

        if let Some(b) = body {
            loop {
                let n = b.stream.read(self.buf.tail());
                if n == 0 {
                    break;
                }
                t.write_all(self.buf.staged(n))
                    .map_err(|_| ClientError::Unavailable)?;
            }
        }
        Ok(())
    }

    fn read_body<T: Transport, S: ResponseSink>(
        &mut self,
        t: &mut T,
        interest: &HeaderSet,
        sink: &mut S,
    ) -> Result<(), ClientError> {
        if let Some(enc) = interest.get(Header::ContentEncoding) {
            if enc.encoding_count() > 0 && enc.first_encoding() != Some(Encoding::Identity) {
                return Err(ClientError::ContentEncoding);
            }
        }

        match interest.content_length() {
            Some(0) => Ok(()),
            Some(n) => self.read_sized(t, n as usize, sink),
            None => self.read_chunked(t, interest, sink),
        }
    }

    fn read_sized<T: Transport, S: ResponseSink>(
        &mut self,
        t: &mut T,
        mut remaining: usize,
        sink: &mut S,
    ) -> Result<(), ClientError> {
        loop {
            let have = self.buf.len().min(remaining);
            if have > 0 {
                let ok = {
                    let s = self.buf.scratch();
                    sink.body(&s.bytes()[..have])
                };
                if !ok {
                    return Err(ClientError::Aborted);
                }
                self.buf.drop_front(have);
                remaining -= have;
            }
            if remaining == 0 {
                return Ok(());
            }
            match t.recv(self.buf.tail()) {
                Ok(Recv::Data(n)) => self.buf.stored(n),
                Ok(Recv::Idle) | Ok(Recv::Closed) => return Err(ClientError::BadResponse),
                Err(_) => return Err(ClientError::Unavailable),
            }
        }
    }

    fn read_chunked<T: Transport, S: ResponseSink>(
        &mut self,
        t: &mut T,
        interest: &HeaderSet,
        sink: &mut S,
    ) -> Result<(), ClientError> {
        let chunked = interest
            .get(Header::TransferEncoding)
            .map(|v| v.encoding_count() == 1 && v.contains_encoding(Encoding::Chunked))
            .unwrap_or(false);
        if !chunked {
            return Err(ClientError::BadResponse);
        }

        let mut d = Dechunker::new();
        let mut piece = [0u8; 512];
        loop {
            let (used, produced) = {
                let s = self.buf.scratch();
                d.parse_input(s.bytes(), &mut piece)
                    .map_err(|_| ClientError::BadResponse)?
            };
            if produced > 0 && !sink.body(&piece[..produced]) {
                return Err(ClientError::Aborted);
            }
            if used > 0 {
                self.buf.drop_front(used);
            }
            if d.is_done() {
                return Ok(());
            }
            if used == 0 && produced == 0 {
                match t.recv(self.buf.tail()) {
                    Ok(Recv::Data(n)) => self.buf.stored(n),
                    Ok(Recv::Idle) | Ok(Recv::Closed) => return Err(ClientError::BadResponse),
                    Err(_) => return Err(ClientError::Unavailable),
                }
            }
        }
    }
}

/// One-shot GET over plain TCP.
pub fn get(url: &str, sink: &mut impl ResponseSink) -> Result<u16, ClientError> {
    let mut client: HttpClient = HttpClient::new();
    let req = HttpRequest {
        method: Method::Get,
        url,
        headers: &[],
    };
    client.send(&req, None, &mut tcp_connect, sink)
}

/// The plain-TCP connect factory. TLS users supply their own returning
/// a TLS transport for [`UrlScheme::Https`].
pub fn tcp_connect(
    scheme: UrlScheme,
    host: &str,
    port: u16,
) -> Result<TcpTransport, ClientError> {
    if scheme == UrlScheme::Https {
        return Err(ClientError::BadUrl("https needs a TLS transport"));
    }
    TcpTransport::connect(host, port).map_err(ClientError::Io)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::net::mem::{pair, MemTransport};
    use std::io::Write;

    struct Collect {
        status: u16,
        headers: Vec<(Header, Vec<u8>)>,
        body: Vec<u8>,
    }

    impl Collect {
        fn new() -> Collect {
            Collect {
                status: 0,
                headers: Vec::new(),
                body: Vec::new(),
            }
        }
    }

    impl ResponseSink for Collect {
        fn status(&mut self, code: u16) {
            self.status = code;
        }

        fn header(&mut self, h: Header, value: &[u8]) {
            self.headers.push((h, value.to_vec()));
        }

        fn body(&mut self, chunk: &[u8]) -> bool {
            self.body.extend_from_slice(chunk);
            true
        }
    }

    /// Factory handing out pre-scripted connections in order.
    fn scripted(
        responses: Vec<&'static [u8]>,
    ) -> (
        impl FnMut(UrlScheme, &str, u16) -> Result<MemTransport, ClientError>,
        Vec<MemTransport>,
    ) {
        let mut ours = Vec::new();
        let mut theirs = Vec::new();
        for r in responses {
            let (mine, mut other) = pair();
            other.write_all(r).unwrap();
            ours.push(mine);
            theirs.push(other);
        }
        let mut i = 0;
        let f = move |_s: UrlScheme, _h: &str, _p: u16| {
            let t = ours
                .get_mut(i)
                .map(|slot| std::mem::replace(slot, pair().0));
            i += 1;
            t.ok_or(ClientError::Unavailable)
        };
        (f, theirs)
    }

    #[test]
    fn url_splitting() {
        let p = split_url("http://host.test:8080/a/b?q=1").unwrap();
        assert_eq!(p.scheme, UrlScheme::Http);
        assert_eq!(p.host, "host.test");
        assert_eq!(p.port, 8080);
        assert_eq!(p.path, "/a/b?q=1");

        let p = split_url("https://host.test").unwrap();
        assert_eq!(p.port, 443);
        assert_eq!(p.path, "/");

        assert!(matches!(
            split_url("http://user:pw@host.test/"),
            Err(ClientError::BadUrl(_))
        ));
        assert!(matches!(
            split_url("ftp://host.test/"),
            Err(ClientError::BadUrl(_))
        ));
        assert!(matches!(
            split_url("hostname-only"),
            Err(ClientError::BadUrl(_))
        ));
    }

    #[test]
    fn get_with_sized_body() {
        let (mut connect, mut peers) = scripted(vec![
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello",
        ]);
        let mut sink = Collect::new();
        let mut client: HttpClient<256> = HttpClient::new();
        let req = HttpRequest {
            method: Method::Get,
            url: "http://dev.test/info?x=1",
            headers: &[("X-Token", "abc")],
        };
        let code = client.send(&req, None, &mut connect, &mut sink).unwrap();

        assert_eq!(code, 200);
        assert_eq!(sink.status, 200);
        assert_eq!(sink.body, b"hello");
        assert!(sink
            .headers
            .iter()
            .any(|(h, v)| *h == Header::ContentLength && v == b"5"));

        let sent = peers[0].drain();
        let text = String::from_utf8(sent).unwrap();
        assert!(text.starts_with("GET /info?x=1 HTTP/1.1\r\n"), "{}", text);
        assert!(text.contains("Host:dev.test\r\n"), "{}", text);
        assert!(text.contains("X-Token:abc\r\n"), "{}", text);
        assert!(text.contains("Accept-Encoding:identity\r\n"), "{}", text);
        assert!(text.ends_with("\r\n\r\n"), "{}", text);
    }

    #[test]
    fn chunked_body_is_decoded() {
        let (mut connect, _peers) = scripted(vec![
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nab\r\n3\r\ncde\r\n0\r\n",
        ]);
        let mut sink = Collect::new();
        let mut client: HttpClient<256> = HttpClient::new();
        let req = HttpRequest {
            method: Method::Get,
            url: "http://dev.test/stream",
            headers: &[],
        };
        let code = client.send(&req, None, &mut connect, &mut sink).unwrap();
        assert_eq!(code, 200);
        assert_eq!(sink.body, b"abcde");
    }

    #[test]
    fn post_writes_body_and_length() {
        let (mut connect, mut peers) =
            scripted(vec![b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n"]);
        let mut sink = Collect::new();
        let mut client: HttpClient<256> = HttpClient::new();

        let mut stream = crate::stream::MemoryStream::new(b"name=alice");
        let body = BodySource {
            mime: MimeType::ApplicationXWwwFormUrlencoded,
            stream: &mut stream,
        };
        let req = HttpRequest {
            method: Method::Post,
            url: "http://dev.test/f",
            headers: &[],
        };
        let code = client
            .send(&req, Some(body), &mut connect, &mut sink)
            .unwrap();
        assert_eq!(code, 204);

        let text = String::from_utf8(peers[0].drain()).unwrap();
        assert!(text.starts_with("POST /f HTTP/1.1\r\n"), "{}", text);
        assert!(
            text.contains("Content-Type:application/x-www-form-urlencoded\r\n"),
            "{}",
            text
        );
        assert!(text.contains("Content-Length:10\r\n"), "{}", text);
        assert!(text.ends_with("name=alice"), "{}", text);
    }

    #[test]
    fn follows_redirect_once() {
        let (mut connect, mut peers) = scripted(vec![
            b"HTTP/1.1 302 Found\r\nLocation: http://dev.test/new\r\nContent-Length: 0\r\n\r\n",
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok",
        ]);
        let mut sink = Collect::new();
        let mut client: HttpClient<256> = HttpClient::new();
        let req = HttpRequest {
            method: Method::Get,
            url: "http://dev.test/old",
            headers: &[],
        };
        let code = client.send(&req, None, &mut connect, &mut sink).unwrap();
        assert_eq!(code, 200);
        assert_eq!(sink.body, b"ok");

        let second = String::from_utf8(peers[1].drain()).unwrap();
        assert!(second.starts_with("GET /new HTTP/1.1\r\n"), "{}", second);
    }

    #[test]
    fn redirect_loop_exhausts_budget() {
        let loop_res: &'static [u8] =
            b"HTTP/1.1 301 Moved\r\nLocation: http://dev.test/loop\r\n\r\n";
        let (mut connect, _peers) = scripted(vec![loop_res, loop_res, loop_res, loop_res]);
        let mut sink = Collect::new();
        let mut client: HttpClient<256> = HttpClient::new();
        let req = HttpRequest {
            method: Method::Get,
            url: "http://dev.test/loop",
            headers: &[],
        };
        let err = client.send(&req, None, &mut connect, &mut sink).unwrap_err();
        assert!(matches!(err, ClientError::OutOfRetries));
    }

    #[test]
    fn non_identity_encoding_fails() {
        let (mut connect, _peers) = scripted(vec![
            b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: 4\r\n\r\nzzzz",
        ]);
        let mut sink = Collect::new();
        let mut client: HttpClient<256> = HttpClient::new();
        let req = HttpRequest {
            method: Method::Get,
            url: "http://dev.test/z",
            headers: &[],
        };
        let err = client.send(&req, None, &mut connect, &mut sink).unwrap_err();
        assert!(matches!(err, ClientError::ContentEncoding));
    }

    #[test]
    fn https_refused_without_tls_factory() {
        let mut sink = Collect::new();
        let mut client: HttpClient<256> = HttpClient::new();
        let req = HttpRequest {
            method: Method::Get,
            url: "https://secure.test/",
            headers: &[],
        };
        let err = client
            .send(&req, None, &mut |s, h, p| tcp_connect(s, h, p), &mut sink)
            .unwrap_err();
        assert!(matches!(err, ClientError::BadUrl(_)));
    }
}
