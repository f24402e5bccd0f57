//! One connection slot: the parsing state machine over the dual-ended
//! buffer, body intake, and response emission.

use core::fmt::Write as _;
use std::time::Duration;

use log::{debug, info, trace};

use crate::chunk::ChunkedWriter;
use crate::headers::HeaderSet;
use crate::net::{Poll, Recv, Transport};
use crate::path;
use crate::proto::reqline::{only_path, query_of, Query, RequestLine};
use crate::server::answer::{Answer, CodeAnswer};
use crate::server::forms::FormPost;
use crate::stream::{InputStream, OutputStream};
use crate::util::Span;
use crate::vault::View;
use crate::{Code, Error, Header, Method, MimeType, Out, Result, TransientVault, OVERFLOW};

/// Fresh connections may sit idle for this many loop ticks.
pub const DEFAULT_TTL: u8 = 255;

/// What the router reports back to the server loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    Error,
    Processing,
    NeedRefill,
    Done,
}

/// Parse progression of a connection. Strictly linear; a finished (or
/// failed) request goes back to `Invalid`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Invalid,
    ReqLine,
    RecvHeaders,
    NeedRefillHeaders,
    HeadersDone,
    ReqDone,
}

/// A client slot. All per-request state lives in the embedded buffer;
/// the slot is reused for the next connection after close.
pub struct Client<T: Transport, const N: usize = 1024> {
    transport: Option<T>,
    status: Status,
    pub(crate) buf: TransientVault<N>,
    req: RequestLine,
    persist_mark: usize,
    ttl: u8,
    keep_alive: bool,
    responded: bool,
}

impl<T: Transport, const N: usize> Default for Client<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport, const N: usize> Client<T, N> {
    pub fn new() -> Client<T, N> {
        Client {
            transport: None,
            status: Status::Invalid,
            buf: TransientVault::new(),
            req: RequestLine::new(),
            persist_mark: 0,
            ttl: 0,
            keep_alive: false,
            responded: false,
        }
    }

    /// Take ownership of a fresh connection.
    pub(crate) fn attach(&mut self, transport: T) {
        self.soft_reset();
        self.transport = Some(transport);
        self.ttl = DEFAULT_TTL;
    }

    /// A slot is in use iff it holds a live transport.
    pub fn is_valid(&self) -> bool {
        self.transport.is_some()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn method(&self) -> Option<Method> {
        self.req.method
    }

    /// The normalized request-target (path plus query).
    pub fn request_target(&self) -> &[u8] {
        self.buf.bytes(self.req.uri.absolute_path)
    }

    /// The normalized path, without the query part.
    pub fn request_path(&self) -> &[u8] {
        only_path(self.request_target())
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(query_of(self.request_target()))
    }

    /// The connection buffer, to resolve header value views against.
    pub fn buffer(&self) -> &TransientVault<N> {
        &self.buf
    }

    /// Keep the connection open after this response.
    pub fn keep_alive(&mut self) {
        self.keep_alive = true;
    }

    /// Force the connection closed after this response.
    pub fn force_close(&mut self) {
        self.keep_alive = false;
        self.ttl = 0;
    }

    pub(crate) fn poll(&mut self) -> Poll {
        match self.transport.as_mut() {
            Some(t) => t.poll_readable(),
            None => Poll::Broken,
        }
    }

    /// One receive into the free region of the buffer. The caller
    /// accounts the bytes with the state machine via [`Self::parse`].
    pub(crate) fn receive(&mut self) -> Result<Recv> {
        let Some(t) = self.transport.as_mut() else {
            return Err(Error::SocketError);
        };
        t.recv(self.buf.tail())
    }

    pub(crate) fn stored(&mut self, n: usize) {
        self.buf.stored(n);
    }

    /// Advance the parse as far as the received bytes allow. Returns
    /// false when the connection died (an error reply was already sent).
    pub fn parse(&mut self) -> bool {
        loop {
            match self.status {
                Status::Invalid => {
                    self.responded = false;
                    self.status = Status::ReqLine;
                }
                Status::ReqLine => {
                    let complete = {
                        let s = self.buf.scratch();
                        Span::of(0..s.len()).find(s.bytes(), b"\r\n").is_some()
                    };
                    if !complete {
                        if self.buf.free() > 0 {
                            return true;
                        }
                        return self.close_with_error(Code::EntityTooLarge);
                    }

                    let consumed = {
                        let s = self.buf.scratch();
                        let mut span = Span::of(0..s.len());
                        match self.req.parse(&s, &mut span) {
                            Ok(_) => span.start,
                            Err(_) => return self.close_with_error(Code::BadRequest),
                        }
                    };
                    trace!(
                        "request line: {:?} {:?}",
                        self.req.method,
                        self.req.version
                    );
                    self.status = Status::RecvHeaders;

                    if !self.normalize_uri() {
                        return self.close_with_error(Code::BadRequest);
                    }
                    // The routes need the target after the scratch area
                    // is refilled, so it moves to the vault now.
                    if !self.req.persist(&mut self.buf, consumed) {
                        return self.close_with_error(Code::InternalServerError);
                    }
                    self.persist_mark = self.buf.vault_len();
                }
                Status::RecvHeaders | Status::NeedRefillHeaders => {
                    let (block_done, empty_block) = {
                        let s = self.buf.scratch();
                        let b = s.bytes();
                        (
                            Span::of(0..b.len()).find(b, b"\r\n\r\n").is_some(),
                            b == b"\r\n",
                        )
                    };
                    if block_done || empty_block {
                        self.status = Status::HeadersDone;
                        return true;
                    }
                    if self.buf.free() > 0 {
                        return true;
                    }
                    if self.buf.len() < 64 {
                        // The vault ate so much that no useful amount of
                        // header text fits anymore.
                        return self.close_with_error(Code::EntityTooLarge);
                    }
                    self.status = Status::NeedRefillHeaders;
                    return true;
                }
                Status::HeadersDone | Status::ReqDone => return true,
            }
        }
    }

    fn normalize_uri(&mut self) -> bool {
        let View::Scratch { off, len, gen } = self.req.uri.absolute_path else {
            return false;
        };
        debug_assert_eq!(gen, self.buf.generation());
        let start = off as usize;
        let b = self.buf.scratch_mut();
        let Some(n) = path::normalize(b, start, len as usize) else {
            return false;
        };
        let n = path::url_decode(b, start, n);
        self.req.uri.absolute_path = View::Scratch {
            off,
            len: n as u32,
            gen,
        };
        true
    }

    pub(crate) fn has_persisted_headers(&self) -> bool {
        self.buf.vault_len() > self.persist_mark
    }

    /// Re-entry into a route after a refill: restore the header set
    /// saved in the vault and reclaim its reservation.
    pub(crate) fn route_found(&mut self, headers: &mut HeaderSet) {
        if self.has_persisted_headers() {
            if !headers.load_from_vault(&self.buf) {
                debug!("restoring header set failed");
            }
            self.buf.reset_vault(self.persist_mark);
        }
    }

    /// About to leave a route for a refill: pack the header set into the
    /// vault so the next entry can pick it up.
    pub(crate) fn save_headers(&mut self, headers: &HeaderSet) -> ClientState {
        if self.status == Status::NeedRefillHeaders {
            self.persist_mark = self.buf.vault_len();
            if !headers.save_in_vault(&mut self.buf) {
                self.close_with_error(Code::InternalServerError);
                return ClientState::Error;
            }
        }
        ClientState::NeedRefill
    }

    /// Eagerly read a `application/x-www-form-urlencoded` body into the
    /// scratch area and split it into the declared form keys. Rejects
    /// multipart, other content types, and bodies beyond the buffer.
    pub fn fetch_form<const K: usize>(
        &mut self,
        headers: &HeaderSet,
        form: &mut FormPost<K>,
    ) -> bool {
        if self.status != Status::HeadersDone {
            return false;
        }
        if headers.content_type() != Some(MimeType::ApplicationXWwwFormUrlencoded) {
            return false;
        }
        let expected = headers.content_length().unwrap_or(0) as usize;
        if self.buf.max_size() < expected {
            return false;
        }
        while self.buf.len() < expected {
            match self.receive() {
                Ok(Recv::Data(n)) => self.buf.stored(n),
                Ok(Recv::Idle) => std::thread::sleep(Duration::from_millis(1)),
                Ok(Recv::Closed) | Err(_) => return false,
            }
        }
        let decoded = path::url_decode(self.buf.scratch_mut(), 0, expected);
        let s = self.buf.scratch();
        form.parse(&s, Span::of(0..decoded));
        true
    }

    /// Stream a request body into `sink`: first whatever already sits in
    /// the scratch area, then the rest from the wire. Multipart bodies
    /// are rejected.
    pub fn fetch_body(&mut self, headers: &HeaderSet, sink: &mut dyn OutputStream) -> bool {
        if self.status != Status::HeadersDone {
            return false;
        }
        if headers.content_type() == Some(MimeType::MultipartFormData) {
            return false;
        }
        let mut expected = headers.content_length().unwrap_or(0) as usize;

        let have = self.buf.len().min(expected);
        if have > 0 {
            let ok = {
                let s = self.buf.scratch();
                sink.write(&s.bytes()[..have]) == have
            };
            if !ok {
                return false;
            }
            expected -= have;
        }
        self.buf.reset_scratch();

        while expected > 0 {
            let n = match self.receive() {
                Ok(Recv::Data(n)) => n,
                Ok(Recv::Idle) => {
                    std::thread::sleep(Duration::from_millis(1));
                    continue;
                }
                Ok(Recv::Closed) | Err(_) => return false,
            };
            let take = n.min(expected);
            if sink.write(self.buf.staged(take)) != take {
                return false;
            }
            expected -= take;
        }
        true
    }

    /// Reply with a status and a plain-text message. A message still in
    /// the scratch area is persisted first, since emission reuses the
    /// scratch for buffering.
    pub fn reply(&mut self, code: Code, msg: View) -> bool {
        let mut msg = msg;
        if msg.is_scratch() {
            let whole = self.buf.len();
            if !self.buf.persist_view(&mut msg, whole) {
                return self.close_with_error(Code::InternalServerError);
            }
        }

        if self.send_status(code).is_err() {
            self.close();
            return false;
        }
        self.buf.reset_scratch();
        if !self.keep_alive && self.send_raw(b"Connection:close\r\n").is_err() {
            self.close();
            return false;
        }
        if self.send_raw(b"Content-Type:text/plain\r\n").is_err() {
            self.close();
            return false;
        }
        if self.send_size(msg.len()).is_err() {
            self.close();
            return false;
        }
        if self.req.method != Some(Method::Head) && !msg.is_empty() {
            let ok = {
                let Some(t) = self.transport.as_mut() else {
                    return false;
                };
                t.write_all(self.buf.bytes(msg)).is_ok()
            };
            if !ok {
                self.close();
                return false;
            }
        }
        self.finish(code, msg.len());
        true
    }

    /// Reply with a status only. Always closes.
    pub fn reply_code(&mut self, code: Code) -> bool {
        self.keep_alive = false;
        self.send_answer(CodeAnswer::new(code))
    }

    /// Terminal error: emit the error status and drop the connection.
    /// Always returns false so error paths read as `return
    /// client.close_with_error(..)`.
    pub fn close_with_error(&mut self, code: Code) -> bool {
        self.reply_code(code);
        self.close();
        false
    }

    /// Emit a full response. The status line goes out first, then the
    /// scratch area is repurposed as output staging for headers and
    /// body.
    pub fn send_answer<A: Answer>(&mut self, mut answer: A) -> bool {
        let code = answer.code();

        if self.send_status(code).is_err() {
            self.close();
            return false;
        }
        self.buf.reset_scratch();

        if !answer.has_header(Header::Connection)
            && !self.keep_alive
            && self.send_raw(b"Connection:close\r\n").is_err()
        {
            self.close();
            return false;
        }

        // The shape's headers, staged in the free region.
        let ok = {
            let Some(t) = self.transport.as_mut() else {
                return false;
            };
            let mut out = Out::wrap(self.buf.tail());
            answer.write_headers(&mut out).is_ok() && t.write_all(out.written()).is_ok()
        };
        if !ok {
            self.close();
            return false;
        }

        let head = self.req.method == Some(Method::Head);
        let mut sent = 0;

        match answer.take_stream() {
            Some(mut stream) => {
                let size = stream.size();
                if size > 0 {
                    if self.send_size(size).is_err() {
                        self.close();
                        return false;
                    }
                    while !head {
                        let n = stream.read(self.buf.tail());
                        if n == 0 {
                            break;
                        }
                        let ok = {
                            let Some(t) = self.transport.as_mut() else {
                                return false;
                            };
                            t.write_all(self.buf.staged(n)).is_ok()
                        };
                        if !ok {
                            self.close();
                            return false;
                        }
                        sent += n;
                    }
                } else if stream.has_content() {
                    let te: &[u8] = if answer.has_header(Header::TransferEncoding) {
                        b"\r\n"
                    } else {
                        b"Transfer-Encoding:chunked\r\n\r\n"
                    };
                    if self.send_raw(te).is_err() {
                        self.close();
                        return false;
                    }
                    if !head {
                        let ok = {
                            let Some(t) = self.transport.as_mut() else {
                                return false;
                            };
                            let mut sink = TransportOut(t);
                            let mut chunks = ChunkedWriter::new(&mut sink);
                            answer.send_content(self.buf.tail(), &mut chunks)
                                && chunks.finish()
                        };
                        if !ok {
                            self.close();
                            return false;
                        }
                    }
                } else if self.send_size(0).is_err() {
                    self.close();
                    return false;
                }
            }
            None => {
                if self.send_size(0).is_err() {
                    self.close();
                    return false;
                }
            }
        }

        self.finish(code, sent);
        true
    }

    fn send_status(&mut self, code: Code) -> Result<()> {
        let mut line = [0u8; 64];
        let mut out = Out::wrap(&mut line);
        write!(
            out.writer(),
            "HTTP/1.1 {} {}\r\n",
            code.as_u16(),
            code.reason()
        )
        .or(OVERFLOW)?;
        let n = out.len();
        self.send_raw(&line[..n])
    }

    fn send_size(&mut self, n: usize) -> Result<()> {
        let mut line = [0u8; 48];
        let mut out = Out::wrap(&mut line);
        write!(out.writer(), "Content-Length:{}\r\n\r\n", n).or(OVERFLOW)?;
        let used = out.len();
        self.send_raw(&line[..used])
    }

    fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let t = self.transport.as_mut().ok_or(Error::SocketError)?;
        t.write_all(bytes).map_err(|_| Error::SocketError)
    }

    /// Request served. Log it, then either rearm for keep-alive or shut
    /// the connection down.
    fn finish(&mut self, code: Code, len: usize) {
        self.status = Status::ReqDone;
        let peer = self.transport.as_ref().and_then(|t| t.peer());
        let target = self.buf.bytes(self.req.uri.absolute_path);
        info!(
            "client {} [{}]({}) -> {}{}",
            peer.map(|p| p.to_string()).unwrap_or_default(),
            String::from_utf8_lossy(only_path(target)),
            len,
            code.as_u16(),
            if self.keep_alive { "" } else { " closed" },
        );
        if self.keep_alive {
            self.soft_reset();
            self.ttl = DEFAULT_TTL;
        } else {
            self.close();
        }
        self.responded = true;
    }

    /// Whether a response already went out for the current round.
    pub(crate) fn responded(&self) -> bool {
        self.responded
    }

    /// Tear down the transport and clear the slot.
    pub(crate) fn close(&mut self) {
        if let Some(mut t) = self.transport.take() {
            t.close();
        }
        self.soft_reset();
    }

    fn soft_reset(&mut self) {
        self.buf.reset();
        self.req.reset();
        self.status = Status::Invalid;
        self.persist_mark = 0;
        self.keep_alive = false;
        self.responded = false;
        self.ttl = 0;
    }

    /// Age an idle connection by one tick. False means the TTL ran out
    /// and the slot was closed.
    pub(crate) fn tick_idle(&mut self) -> bool {
        if self.ttl > 0 {
            self.ttl -= 1;
        }
        if self.ttl == 0 {
            trace!("idle ttl expired");
            self.close();
            return false;
        }
        true
    }
}

/// Adapter sending stream writes straight to the transport.
struct TransportOut<'a, T: Transport>(&'a mut T);

impl<T: Transport> OutputStream for TransportOut<'_, T> {
    fn write(&mut self, buf: &[u8]) -> usize {
        match self.0.write_all(buf) {
            Ok(()) => buf.len(),
            Err(_) => 0,
        }
    }
}
