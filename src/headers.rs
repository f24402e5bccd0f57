//! Typed header collections.
//!
//! A [`HeaderSet`] is the request side: built from a route's declared
//! header list (plus the implicit members every request needs), filled by
//! the parser, persisted across scratch refills through the vault. An
//! [`AnswerHeaders`] is the response side: same keying, but values are
//! set by the handler and emitted as header lines.

use crate::proto::token::ConnectionOption;
use crate::proto::value::HeaderValue;
use crate::proto::Parsing;
use crate::util::{eq_ignore_case, Span};
use crate::vault::{Scratch, TransientVault, ViewBytes};
use crate::{Header, MimeType, Out, Result};

/// Fixed capacity of a header collection. A route declaring more
/// recognized headers than this is a configuration error.
pub const SET_MAX: usize = 16;

const IMPLICIT_PLAIN: &[Header] = &[Header::Authorization, Header::Connection];
const IMPLICIT_BODY: &[Header] = &[
    Header::ContentType,
    Header::ContentLength,
    Header::Connection,
];

#[derive(Debug)]
pub struct HeaderSet {
    names: [Header; SET_MAX],
    values: [HeaderValue; SET_MAX],
    len: usize,
}

impl HeaderSet {
    /// A set with exactly the given headers, deduplicated, order kept.
    pub fn of(declared: &[Header]) -> HeaderSet {
        let mut set = HeaderSet {
            names: [Header::Connection; SET_MAX],
            values: [HeaderValue::Uint(None); SET_MAX],
            len: 0,
        };
        for h in declared {
            set.push_unique(*h);
        }
        set
    }

    /// The set a route parses into: declared headers plus the implicit
    /// members. Routes accepting a request body get the content headers,
    /// everything else gets authorization.
    pub fn for_route(declared: &[Header], with_body: bool) -> HeaderSet {
        let mut set = HeaderSet::of(declared);
        let implicit = if with_body {
            IMPLICIT_BODY
        } else {
            IMPLICIT_PLAIN
        };
        for h in implicit {
            set.push_unique(*h);
        }
        set
    }

    fn push_unique(&mut self, h: Header) {
        if self.contains(h) {
            return;
        }
        assert!(self.len < SET_MAX, "too many headers declared");
        self.names[self.len] = h;
        self.values[self.len] = HeaderValue::for_header(h);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, h: Header) -> bool {
        self.names[..self.len].contains(&h)
    }

    fn position(&self, h: Header) -> Option<usize> {
        self.names[..self.len].iter().position(|n| *n == h)
    }

    pub fn get(&self, h: Header) -> Option<&HeaderValue> {
        self.position(h).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, h: Header) -> Option<&mut HeaderValue> {
        self.position(h).map(move |i| &mut self.values[i])
    }

    /// Match a wire header name against the declared set. Linear in the
    /// set size, which is much smaller than the full header space.
    pub fn accept(&self, name: &[u8]) -> Option<Header> {
        self.names[..self.len]
            .iter()
            .copied()
            .find(|h| eq_ignore_case(h.as_str().as_bytes(), name))
    }

    pub(crate) fn index_of(&self, name: &[u8]) -> Option<usize> {
        self.names[..self.len]
            .iter()
            .position(|h| eq_ignore_case(h.as_str().as_bytes(), name))
    }

    /// Route a recognized header's value to its slot parser.
    pub fn accept_and_parse(
        &mut self,
        name: &[u8],
        s: &Scratch<'_>,
        value: &mut Span,
    ) -> Result<Parsing> {
        match self.index_of(name) {
            Some(i) => self.values[i].parse(s, value),
            None => Err(crate::Error::InvalidRequest),
        }
    }

    pub(crate) fn parse_at(
        &mut self,
        i: usize,
        s: &Scratch<'_>,
        value: &mut Span,
    ) -> Result<Parsing> {
        self.values[i].parse(s, value)
    }

    pub(crate) fn slot_needs_persist(&mut self, i: usize) -> bool {
        self.values[i].needs_persist()
    }

    /// Move one slot's strings into the vault, dropping the already
    /// parsed prefix of scratch in the same step.
    pub(crate) fn persist_slot<const N: usize>(
        &mut self,
        vault: &mut TransientVault<N>,
        i: usize,
        future_drop: usize,
    ) -> bool {
        self.values[i].persist(vault, future_drop)
    }

    /// Move every slot's strings into the vault (without dropping), so
    /// the parsed block can be discarded afterwards.
    pub(crate) fn persist_all<const N: usize>(&mut self, vault: &mut TransientVault<N>) -> bool {
        for i in 0..self.len {
            if self.values[i].needs_persist() && !self.values[i].persist(vault, 0) {
                return false;
            }
        }
        true
    }

    /// Pack the whole set into one vault reservation. All string views
    /// must already live in the vault.
    pub fn save_in_vault<const N: usize>(&self, vault: &mut TransientVault<N>) -> bool {
        let total: usize = self.values[..self.len].iter().map(|v| v.saved_size()).sum();
        let Some(region) = vault.reserve_slice(total) else {
            return false;
        };
        let mut out = Out::wrap(region);
        for v in &self.values[..self.len] {
            if v.save(&mut out).is_err() {
                return false;
            }
        }
        true
    }

    /// Restore a set packed by [`Self::save_in_vault`]. The reservation
    /// sits at the vault head; field order is stable.
    pub fn load_from_vault<const N: usize>(&mut self, vault: &TransientVault<N>) -> bool {
        let inp = vault.vault();
        let mut pos = 0;
        for i in 0..self.len {
            if !self.values[i].load(inp, &mut pos) {
                return false;
            }
        }
        true
    }

    // The accessors the state machine needs.

    pub fn content_length(&self) -> Option<u64> {
        self.get(Header::ContentLength).and_then(|v| v.as_uint())
    }

    pub fn content_type(&self) -> Option<MimeType> {
        self.get(Header::ContentType).and_then(|v| v.mime())
    }

    pub fn connection(&self) -> Option<ConnectionOption> {
        self.get(Header::Connection).and_then(|v| v.as_connection())
    }
}

/// The headers an answer intends to emit. Values left unset are skipped
/// on the wire.
#[derive(Debug)]
pub struct AnswerHeaders {
    names: [Header; SET_MAX],
    values: [HeaderValue; SET_MAX],
    len: usize,
}

impl AnswerHeaders {
    pub fn new(declared: &[Header]) -> AnswerHeaders {
        let mut hs = AnswerHeaders {
            names: [Header::Connection; SET_MAX],
            values: [HeaderValue::Uint(None); SET_MAX],
            len: 0,
        };
        for h in declared {
            if hs.contains(*h) {
                continue;
            }
            assert!(hs.len < SET_MAX, "too many answer headers declared");
            hs.names[hs.len] = *h;
            hs.values[hs.len] = HeaderValue::for_header(*h);
            hs.len += 1;
        }
        hs
    }

    pub fn contains(&self, h: Header) -> bool {
        self.names[..self.len].contains(&h)
    }

    pub fn is_set(&self, h: Header) -> bool {
        self.slot(h).map(|v| v.is_set()).unwrap_or(false)
    }

    fn slot(&self, h: Header) -> Option<&HeaderValue> {
        self.names[..self.len]
            .iter()
            .position(|n| *n == h)
            .map(|i| &self.values[i])
    }

    pub fn slot_mut(&mut self, h: Header) -> Option<&mut HeaderValue> {
        self.names[..self.len]
            .iter()
            .position(|n| *n == h)
            .map(move |i| &mut self.values[i])
    }

    pub fn set_str(&mut self, h: Header, s: &'static str) {
        if let Some(v) = self.slot_mut(h) {
            v.set_str(s);
        }
    }

    pub fn set_view(&mut self, h: Header, view: crate::View) {
        if let Some(v) = self.slot_mut(h) {
            v.set_view(view);
        }
    }

    pub fn set_uint(&mut self, h: Header, n: u64) {
        if let Some(v) = self.slot_mut(h) {
            v.set_uint(n);
        }
    }

    pub fn set_mime(&mut self, h: Header, m: MimeType) {
        if let Some(v) = self.slot_mut(h) {
            v.set_mime(m);
        }
    }

    pub fn set_connection(&mut self, c: ConnectionOption) {
        if let Some(v) = self.slot_mut(Header::Connection) {
            v.set_connection(c);
        }
    }

    pub fn push_encoding(&mut self, h: Header, e: crate::proto::token::Encoding) {
        if let Some(v) = self.slot_mut(h) {
            v.push_encoding(e);
        }
    }

    /// Emit `Name:value CRLF` for every slot holding a value.
    pub fn write_all(&self, src: &dyn ViewBytes, out: &mut Out) -> Result<()> {
        for i in 0..self.len {
            let v = &self.values[i];
            if !v.is_set() {
                continue;
            }
            out.write_bytes(self.names[i].as_str().as_bytes())?;
            out.write_bytes(b":")?;
            v.write(src, out)?;
            out.write_bytes(b"\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vault::NoViews;
    use crate::View;

    #[test]
    fn implicit_members() {
        let set = HeaderSet::for_route(&[Header::Host, Header::Accept], false);
        assert_eq!(set.len(), 4);
        assert!(set.contains(Header::Host));
        assert!(set.contains(Header::Accept));
        assert!(set.contains(Header::Authorization));
        assert!(set.contains(Header::Connection));

        let post = HeaderSet::for_route(&[Header::ContentLength], true);
        // ContentLength declared and implicit, deduplicated.
        assert_eq!(post.len(), 3);
        assert!(post.contains(Header::ContentType));
        assert!(post.contains(Header::Connection));
    }

    #[test]
    fn accept_is_case_insensitive_and_scoped() {
        let set = HeaderSet::for_route(&[Header::Host], false);
        assert_eq!(set.accept(b"HOST"), Some(Header::Host));
        assert_eq!(set.accept(b"host"), Some(Header::Host));
        assert_eq!(set.accept(b"authorization"), Some(Header::Authorization));
        // Known header, but not declared by this set.
        assert_eq!(set.accept(b"content-length"), None);
        assert_eq!(set.accept(b"x-whatever"), None);
    }

    #[test]
    fn parse_into_slots() {
        let mut vault: crate::TransientVault<256> = crate::TransientVault::new();
        vault.append(b"Content-Length: 42\r\n");

        let mut set = HeaderSet::for_route(&[], true);
        {
            let s = vault.scratch();
            let mut value = Span::of(15..18);
            set.accept_and_parse(b"Content-Length", &s, &mut value)
                .unwrap();
        }
        assert_eq!(set.content_length(), Some(42));
    }

    #[test]
    fn vault_roundtrip() {
        let mut vault: crate::TransientVault<512> = crate::TransientVault::new();
        vault.append(b"Host: device.local\r\n");

        let mut set = HeaderSet::for_route(&[Header::Host], false);
        {
            let s = vault.scratch();
            let mut value = Span::of(6..18);
            set.accept_and_parse(b"Host", &s, &mut value).unwrap();
        }
        assert!(set.persist_all(&mut vault));

        let keep = vault.vault_len();
        assert!(set.save_in_vault(&mut vault));

        // A refill happens: scratch is gone, the set is rebuilt fresh.
        vault.reset_scratch();
        vault.append(b"completely different bytes");

        let mut restored = HeaderSet::for_route(&[Header::Host], false);
        assert!(restored.load_from_vault(&vault));
        vault.reset_vault(keep);

        let host = restored.get(Header::Host).unwrap().as_view().unwrap();
        assert_eq!(vault.bytes(host), b"device.local");
    }

    #[test]
    fn answer_headers_skip_unset() {
        let mut hs = AnswerHeaders::new(&[
            Header::ContentType,
            Header::Location,
            Header::ContentLength,
        ]);
        hs.set_mime(Header::ContentType, MimeType::TextHtml);
        hs.set_view(Header::Location, View::lit(b"/moved"));

        let mut buf = [0u8; 128];
        let mut out = Out::wrap(&mut buf);
        hs.write_all(&NoViews, &mut out).unwrap();
        assert_eq!(
            out.written(),
            b"Content-Type:text/html\r\nLocation:/moved\r\n"
        );
    }

    #[test]
    fn answer_connection() {
        let mut hs = AnswerHeaders::new(&[Header::Connection]);
        assert!(!hs.is_set(Header::Connection));
        hs.set_connection(ConnectionOption::KeepAlive);
        assert!(hs.is_set(Header::Connection));

        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        hs.write_all(&NoViews, &mut out).unwrap();
        assert_eq!(out.written(), b"Connection:keep-alive\r\n");
    }
}
