//! One value shape per header. A route's header set owns one
//! [`HeaderValue`] per declared header; parsing fills it in place from the
//! scratch area, persistence moves its string views into the vault, and
//! the whole thing can be packed into a vault reservation and restored
//! across a refill.

use core::fmt::Write;

use crate::proto::token::{CacheDirective, Charset, ConnectionOption, Encoding, Lang};
use crate::proto::{Parsing, WireEnum};
use crate::util::Span;
use crate::vault::{Scratch, TransientVault, View, ViewBytes};
use crate::{Error, Header, MimeType, Out, Result, OVERFLOW};

/// Upper bound of string views a single value can hold.
pub const LIST_MAX: usize = 16;

/// An enum token with an optional attribute tail, e.g.
/// `text/html; charset=utf-8` or `en;q=0.8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumAttr<E> {
    pub value: Option<E>,
    pub attrs: View,
}

impl<E> Default for EnumAttr<E> {
    fn default() -> Self {
        EnumAttr {
            value: None,
            attrs: View::Empty,
        }
    }
}

impl<E: WireEnum> EnumAttr<E> {
    fn parse(&mut self, s: &Scratch<'_>, val: &mut Span) -> Parsing {
        let b = s.bytes();
        let (mut ident, mut attrs, more) = split_element(b, val);
        if attrs.is_empty() {
            // The value may carry `key=value` directly; round-trips the
            // canonical written form too.
            attrs = ident;
            ident = attrs.split_upto(b, b"=");
        }
        self.value = E::from_bytes(ident.slice(b));
        self.attrs = s.view(attrs.trim(b, b' '));
        more
    }

    fn write(&self, src: &dyn ViewBytes, out: &mut Out) -> Result<()> {
        if let Some(v) = self.value {
            out.write_bytes(v.as_str().as_bytes())?;
        }
        if !self.attrs.is_empty() {
            out.write_bytes(b"=")?;
            out.write_bytes(src.view_bytes(self.attrs))?;
        }
        Ok(())
    }

    /// Value of a named attribute, e.g. `charset` out of
    /// `charset=utf-8; boundary=x`.
    pub fn attribute<'b>(&self, src: &'b dyn ViewBytes, key: &[u8]) -> Option<&'b [u8]> {
        let raw = src.view_bytes(self.attrs);
        let mut rest = Span::of(0..raw.len());
        while !rest.is_empty() {
            let mut pair = rest.split_upto(raw, b";");
            let k = pair.split_upto(raw, b"=").trim(raw, b' ');
            if crate::util::eq_ignore_case(k.slice(raw), key) {
                return Some(pair.trim(raw, b' ').slice(raw));
            }
        }
        None
    }
}

/// Bounded list of plain enum tokens; quality suffixes are ignored.
/// Unknown tokens are kept as `None` placeholders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenList<E, const CAP: usize> {
    items: [Option<E>; CAP],
    len: u8,
}

impl<E: WireEnum, const CAP: usize> TokenList<E, CAP> {
    pub fn new() -> Self {
        TokenList {
            items: [None; CAP],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> Option<E> {
        if i < self.len() {
            self.items[i]
        } else {
            None
        }
    }

    pub fn push(&mut self, e: E) {
        if self.len() < CAP {
            self.items[self.len()] = Some(e);
            self.len += 1;
        }
    }

    pub fn contains(&self, e: E) -> bool
    where
        E: PartialEq,
    {
        self.items[..self.len()].iter().any(|i| *i == Some(e))
    }

    fn parse(&mut self, s: &Scratch<'_>, val: &mut Span, strict: bool) -> Result<Parsing> {
        let b = s.bytes();
        self.len = 0;
        loop {
            if self.len() == CAP {
                if !val.is_empty() && strict {
                    return Err(Error::InvalidRequest);
                }
                return Ok(Parsing::MoreData);
            }
            let (ident, _attrs, more) = split_element(b, val);
            self.items[self.len()] = E::from_bytes(ident.slice(b));
            self.len += 1;
            if more == Parsing::EndOfRequest {
                return Ok(Parsing::EndOfRequest);
            }
        }
    }

    fn write(&self, out: &mut Out) -> Result<()> {
        for i in 0..self.len() {
            if i > 0 {
                out.write_bytes(b",")?;
            }
            if let Some(e) = self.items[i] {
                out.write_bytes(e.as_str().as_bytes())?;
            }
        }
        Ok(())
    }

    fn save(&self, out: &mut Out) -> Result<()> {
        out.write_bytes(&[self.len])?;
        for i in 0..CAP {
            let o = self.items[i].map(|e| e.ordinal()).unwrap_or(0xff);
            out.write_bytes(&[o])?;
        }
        Ok(())
    }

    fn load(&mut self, inp: &[u8], pos: &mut usize) -> bool {
        let Some(&len) = inp.get(*pos) else {
            return false;
        };
        *pos += 1;
        if len as usize > CAP || inp.len() < *pos + CAP {
            return false;
        }
        self.len = len;
        for i in 0..CAP {
            self.items[i] = E::from_ordinal(inp[*pos + i]);
        }
        *pos += CAP;
        true
    }
}

impl<E: WireEnum, const CAP: usize> Default for TokenList<E, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded list of [`EnumAttr`] elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrList<E, const CAP: usize> {
    items: [EnumAttr<E>; CAP],
    len: u8,
}

impl<E: WireEnum, const CAP: usize> AttrList<E, CAP> {
    pub fn new() -> Self {
        AttrList {
            items: [EnumAttr {
                value: None,
                attrs: View::Empty,
            }; CAP],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> Option<&EnumAttr<E>> {
        self.items[..self.len()].get(i)
    }

    pub fn push(&mut self, e: E) {
        if self.len() < CAP {
            self.items[self.len()] = EnumAttr {
                value: Some(e),
                attrs: View::Empty,
            };
            self.len += 1;
        }
    }

    pub fn contains(&self, e: E) -> bool
    where
        E: PartialEq,
    {
        self.items[..self.len()].iter().any(|i| i.value == Some(e))
    }

    fn parse(&mut self, s: &Scratch<'_>, val: &mut Span) -> Result<Parsing> {
        self.len = 0;
        loop {
            if self.len() == CAP {
                return Ok(Parsing::MoreData);
            }
            let i = self.len();
            let more = self.items[i].parse(s, val);
            self.len += 1;
            if more == Parsing::EndOfRequest {
                return Ok(Parsing::EndOfRequest);
            }
        }
    }

    fn write(&self, src: &dyn ViewBytes, out: &mut Out) -> Result<()> {
        for i in 0..self.len() {
            if i > 0 {
                out.write_bytes(b",")?;
            }
            self.items[i].write(src, out)?;
        }
        Ok(())
    }

    fn save(&self, out: &mut Out) -> Result<()> {
        out.write_bytes(&[self.len])?;
        for item in &self.items {
            let o = item.value.map(|e| e.ordinal()).unwrap_or(0xff);
            out.write_bytes(&[o])?;
            save_view(&item.attrs, out)?;
        }
        Ok(())
    }

    fn load(&mut self, inp: &[u8], pos: &mut usize) -> bool {
        let Some(&len) = inp.get(*pos) else {
            return false;
        };
        *pos += 1;
        if len as usize > CAP {
            return false;
        }
        self.len = len;
        for item in &mut self.items {
            let Some(&o) = inp.get(*pos) else {
                return false;
            };
            *pos += 1;
            item.value = E::from_ordinal(o);
            if !load_view(&mut item.attrs, inp, pos) {
                return false;
            }
        }
        true
    }
}

impl<E: WireEnum, const CAP: usize> Default for AttrList<E, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `ident [";" attrs] ["," rest]` off the front of a value.
/// Returns the identifier, the attribute tail (empty when absent), and
/// whether more elements follow.
pub(crate) fn split_element(b: &[u8], val: &mut Span) -> (Span, Span, Parsing) {
    let semi = val.find(b, b";");
    let comma = val.find(b, b",");

    let (ident, attrs) = match (semi, comma) {
        (Some(s), c) if c.map_or(true, |c| s < c) => {
            let ident = val.split_at(s).trim(b, b' ');
            val.split_at(1);
            let attrs = match val.find(b, b",") {
                Some(c2) => {
                    let a = val.split_at(c2).trim(b, b' ');
                    val.split_at(1);
                    a
                }
                None => {
                    let a = val.trim(b, b' ');
                    val.split_at(val.len());
                    a
                }
            };
            (ident, attrs)
        }
        (_, Some(c)) => {
            let ident = val.split_at(c).trim(b, b' ');
            val.split_at(1);
            (ident, Span::empty())
        }
        _ => {
            let ident = val.trim(b, b' ');
            val.split_at(val.len());
            (ident, Span::empty())
        }
    };

    let more = if val.is_empty() {
        Parsing::EndOfRequest
    } else {
        Parsing::MoreData
    };
    (ident, attrs, more)
}

/// The tagged value slot for one header. Which variant a header gets is
/// fixed by [`HeaderValue::for_header`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderValue {
    /// Opaque string, right-trimmed.
    Str(View),
    /// Opaque `key=value[;...]` blob with by-key lookup.
    Pairs(View),
    /// Decimal unsigned integer.
    Uint(Option<u64>),
    /// Strict Connection options.
    Conn(Option<ConnectionOption>),
    /// A media type with optional attributes (Content-Type).
    Mime(EnumAttr<MimeType>),
    /// Accept list, strict.
    Mimes(TokenList<MimeType, 16>),
    /// Accept-Charset list.
    Charsets(TokenList<Charset, 4>),
    /// Encoding lists (Accept-Encoding, Content-Encoding, TE,
    /// Transfer-Encoding).
    Encodings(TokenList<Encoding, 4>),
    /// Language lists with attributes.
    Langs(AttrList<Lang, 8>),
    /// Cache-Control directives with attributes.
    Cache(AttrList<CacheDirective, 4>),
}

impl HeaderValue {
    /// The (empty) value shape a given header parses into.
    pub fn for_header(h: Header) -> HeaderValue {
        use HeaderValue::*;
        match h {
            Header::Accept => Mimes(TokenList::new()),
            #[cfg(feature = "max-support")]
            Header::AcceptCharset => Charsets(TokenList::new()),
            Header::AcceptEncoding => Encodings(TokenList::new()),
            Header::AcceptLanguage | Header::ContentLanguage => Langs(AttrList::new()),
            Header::CacheControl => Cache(AttrList::new()),
            Header::Connection => Conn(None),
            Header::ContentEncoding => Encodings(TokenList::new()),
            Header::ContentType => Mime(EnumAttr::default()),
            Header::ContentLength => Uint(None),
            Header::Cookie | Header::Range => Pairs(View::Empty),
            Header::Te | Header::TransferEncoding => Encodings(TokenList::new()),
            _ => Str(View::Empty),
        }
    }

    /// Parse a complete (CRLF-delimited, already extracted) value.
    pub fn parse(&mut self, s: &Scratch<'_>, val: &mut Span) -> Result<Parsing> {
        let b = s.bytes();
        match self {
            HeaderValue::Str(v) | HeaderValue::Pairs(v) => {
                *v = s.view(val.trim(b, b' '));
                val.split_at(val.len());
                Ok(Parsing::EndOfRequest)
            }
            HeaderValue::Uint(v) => {
                let n = val
                    .trim(b, b' ')
                    .parse_u64(b)
                    .ok_or(Error::InvalidRequest)?;
                *v = Some(n);
                val.split_at(val.len());
                Ok(Parsing::EndOfRequest)
            }
            HeaderValue::Conn(v) => {
                let c = ConnectionOption::from_bytes(val.trim(b, b' ').slice(b))
                    .ok_or(Error::InvalidRequest)?;
                *v = Some(c);
                val.split_at(val.len());
                Ok(Parsing::EndOfRequest)
            }
            HeaderValue::Mime(ea) => Ok(ea.parse(s, val)),
            HeaderValue::Mimes(l) => l.parse(s, val, true),
            HeaderValue::Charsets(l) => l.parse(s, val, false),
            HeaderValue::Encodings(l) => l.parse(s, val, false),
            HeaderValue::Langs(l) => l.parse(s, val),
            HeaderValue::Cache(l) => l.parse(s, val),
        }
    }

    /// Write the canonical text form (without header name or CRLF).
    pub fn write(&self, src: &dyn ViewBytes, out: &mut Out) -> Result<()> {
        match self {
            HeaderValue::Str(v) | HeaderValue::Pairs(v) => out.write_bytes(src.view_bytes(*v)),
            HeaderValue::Uint(Some(n)) => write!(out.writer(), "{}", n).or(OVERFLOW),
            HeaderValue::Uint(None) => Ok(()),
            HeaderValue::Conn(Some(c)) => out.write_bytes(c.as_str().as_bytes()),
            HeaderValue::Conn(None) => Ok(()),
            HeaderValue::Mime(ea) => ea.write(src, out),
            HeaderValue::Mimes(l) => l.write(out),
            HeaderValue::Charsets(l) => l.write(out),
            HeaderValue::Encodings(l) => l.write(out),
            HeaderValue::Langs(l) => l.write(src, out),
            HeaderValue::Cache(l) => l.write(src, out),
        }
    }

    /// Whether emitting this value would produce any bytes. Headers whose
    /// value is unset are skipped on the wire.
    pub fn is_set(&self) -> bool {
        match self {
            HeaderValue::Str(v) | HeaderValue::Pairs(v) => !v.is_empty(),
            HeaderValue::Uint(v) => v.is_some(),
            HeaderValue::Conn(v) => v.is_some(),
            HeaderValue::Mime(ea) => ea.value.is_some() || !ea.attrs.is_empty(),
            HeaderValue::Mimes(l) => !l.is_empty(),
            HeaderValue::Charsets(l) => !l.is_empty(),
            HeaderValue::Encodings(l) => !l.is_empty(),
            HeaderValue::Langs(l) => !l.is_empty(),
            HeaderValue::Cache(l) => !l.is_empty(),
        }
    }

    pub(crate) fn for_each_view(&mut self, f: &mut dyn FnMut(&mut View)) {
        match self {
            HeaderValue::Str(v) | HeaderValue::Pairs(v) => f(v),
            HeaderValue::Mime(ea) => f(&mut ea.attrs),
            HeaderValue::Langs(l) => {
                for i in 0..l.len() {
                    f(&mut l.items[i].attrs);
                }
            }
            HeaderValue::Cache(l) => {
                for i in 0..l.len() {
                    f(&mut l.items[i].attrs);
                }
            }
            _ => {}
        }
    }

    /// Does this value currently borrow from the scratch area?
    pub(crate) fn needs_persist(&mut self) -> bool {
        let mut needs = false;
        self.for_each_view(&mut |v| needs |= v.is_scratch());
        needs
    }

    /// Move every contained string into the vault, dropping `future_drop`
    /// leading scratch bytes in the same step.
    pub(crate) fn persist<const N: usize>(
        &mut self,
        vault: &mut TransientVault<N>,
        future_drop: usize,
    ) -> bool {
        let mut copies = [View::Empty; LIST_MAX];
        let mut n = 0;
        self.for_each_view(&mut |v| {
            copies[n] = *v;
            n += 1;
        });
        if !vault.persist_views(&mut copies[..n], future_drop) {
            return false;
        }
        let mut i = 0;
        self.for_each_view(&mut |v| {
            *v = copies[i];
            i += 1;
        });
        true
    }

    /// Packed size of [`Self::save`]'s encoding.
    pub(crate) fn saved_size(&self) -> usize {
        match self {
            HeaderValue::Str(_) | HeaderValue::Pairs(_) => VIEW_SAVED,
            HeaderValue::Uint(_) => 9,
            HeaderValue::Conn(_) => 1,
            HeaderValue::Mime(_) => 1 + VIEW_SAVED,
            HeaderValue::Mimes(_) => 1 + 16,
            HeaderValue::Charsets(_) => 1 + 4,
            HeaderValue::Encodings(_) => 1 + 4,
            HeaderValue::Langs(_) => 1 + 8 * (1 + VIEW_SAVED),
            HeaderValue::Cache(_) => 1 + 4 * (1 + VIEW_SAVED),
        }
    }

    /// Pack this value. Field order is stable; views must already live in
    /// the vault (or be empty).
    pub(crate) fn save(&self, out: &mut Out) -> Result<()> {
        match self {
            HeaderValue::Str(v) | HeaderValue::Pairs(v) => save_view(v, out),
            HeaderValue::Uint(v) => {
                out.write_bytes(&[v.is_some() as u8])?;
                out.write_bytes(&v.unwrap_or(0).to_le_bytes())
            }
            HeaderValue::Conn(v) => {
                out.write_bytes(&[v.map(|c| c.ordinal()).unwrap_or(0xff)])
            }
            HeaderValue::Mime(ea) => {
                out.write_bytes(&[ea.value.map(|m| m.ordinal()).unwrap_or(0xff)])?;
                save_view(&ea.attrs, out)
            }
            HeaderValue::Mimes(l) => l.save(out),
            HeaderValue::Charsets(l) => l.save(out),
            HeaderValue::Encodings(l) => l.save(out),
            HeaderValue::Langs(l) => l.save(out),
            HeaderValue::Cache(l) => l.save(out),
        }
    }

    /// Reverse of [`Self::save`].
    pub(crate) fn load(&mut self, inp: &[u8], pos: &mut usize) -> bool {
        match self {
            HeaderValue::Str(v) | HeaderValue::Pairs(v) => load_view(v, inp, pos),
            HeaderValue::Uint(v) => {
                if inp.len() < *pos + 9 {
                    return false;
                }
                let set = inp[*pos] != 0;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&inp[*pos + 1..*pos + 9]);
                *v = set.then(|| u64::from_le_bytes(raw));
                *pos += 9;
                true
            }
            HeaderValue::Conn(v) => {
                let Some(&o) = inp.get(*pos) else {
                    return false;
                };
                *pos += 1;
                *v = ConnectionOption::from_ordinal(o);
                true
            }
            HeaderValue::Mime(ea) => {
                let Some(&o) = inp.get(*pos) else {
                    return false;
                };
                *pos += 1;
                ea.value = MimeType::from_ordinal(o);
                load_view(&mut ea.attrs, inp, pos)
            }
            HeaderValue::Mimes(l) => l.load(inp, pos),
            HeaderValue::Charsets(l) => l.load(inp, pos),
            HeaderValue::Encodings(l) => l.load(inp, pos),
            HeaderValue::Langs(l) => l.load(inp, pos),
            HeaderValue::Cache(l) => l.load(inp, pos),
        }
    }

    // Typed accessors used by the state machine and the client.

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            HeaderValue::Uint(v) => *v,
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<View> {
        match self {
            HeaderValue::Str(v) | HeaderValue::Pairs(v) if !v.is_empty() => Some(*v),
            _ => None,
        }
    }

    pub fn as_connection(&self) -> Option<ConnectionOption> {
        match self {
            HeaderValue::Conn(v) => *v,
            _ => None,
        }
    }

    pub fn mime(&self) -> Option<MimeType> {
        match self {
            HeaderValue::Mime(ea) => ea.value,
            _ => None,
        }
    }

    pub fn contains_encoding(&self, e: Encoding) -> bool {
        match self {
            HeaderValue::Encodings(l) => l.contains(e),
            _ => false,
        }
    }

    pub fn first_encoding(&self) -> Option<Encoding> {
        match self {
            HeaderValue::Encodings(l) if !l.is_empty() => l.get(0),
            _ => None,
        }
    }

    pub fn encoding_count(&self) -> usize {
        match self {
            HeaderValue::Encodings(l) => l.len(),
            _ => 0,
        }
    }

    // Setters for the answer side.

    pub fn set_view(&mut self, view: View) {
        debug_assert!(matches!(self, HeaderValue::Str(_) | HeaderValue::Pairs(_)));
        if let HeaderValue::Str(v) | HeaderValue::Pairs(v) = self {
            *v = view;
        }
    }

    pub fn set_str(&mut self, s: &'static str) {
        self.set_view(View::lit(s.as_bytes()));
    }

    pub fn set_uint(&mut self, n: u64) {
        debug_assert!(matches!(self, HeaderValue::Uint(_)));
        *self = HeaderValue::Uint(Some(n));
    }

    pub fn set_connection(&mut self, c: ConnectionOption) {
        debug_assert!(matches!(self, HeaderValue::Conn(_)));
        *self = HeaderValue::Conn(Some(c));
    }

    pub fn set_mime(&mut self, m: MimeType) {
        debug_assert!(matches!(self, HeaderValue::Mime(_) | HeaderValue::Mimes(_)));
        match self {
            HeaderValue::Mime(ea) => ea.value = Some(m),
            HeaderValue::Mimes(l) => l.push(m),
            _ => {}
        }
    }

    pub fn push_encoding(&mut self, e: Encoding) {
        debug_assert!(matches!(self, HeaderValue::Encodings(_)));
        if let HeaderValue::Encodings(l) = self {
            l.push(e);
        }
    }

    pub fn push_lang(&mut self, l: Lang) {
        debug_assert!(matches!(self, HeaderValue::Langs(_)));
        if let HeaderValue::Langs(list) = self {
            list.push(l);
        }
    }

    pub fn push_cache(&mut self, d: CacheDirective) {
        debug_assert!(matches!(self, HeaderValue::Cache(_)));
        if let HeaderValue::Cache(list) = self {
            list.push(d);
        }
    }
}

const VIEW_SAVED: usize = 9;

fn save_view(v: &View, out: &mut Out) -> Result<()> {
    match v {
        View::Empty => {
            out.write_bytes(&[0])?;
            out.write_bytes(&[0; 8])
        }
        View::Vault { off, len } => {
            out.write_bytes(&[1])?;
            out.write_bytes(&off.to_le_bytes())?;
            out.write_bytes(&len.to_le_bytes())
        }
        View::Scratch { .. } | View::Lit(_) => {
            // Only vault-resident strings survive a refill; the caller
            // persists before saving.
            debug_assert!(false, "saving a non-vault view");
            out.write_bytes(&[0])?;
            out.write_bytes(&[0; 8])
        }
    }
}

fn load_view(v: &mut View, inp: &[u8], pos: &mut usize) -> bool {
    if inp.len() < *pos + VIEW_SAVED {
        return false;
    }
    let tag = inp[*pos];
    let mut w = [0u8; 4];
    w.copy_from_slice(&inp[*pos + 1..*pos + 5]);
    let off = u32::from_le_bytes(w);
    w.copy_from_slice(&inp[*pos + 5..*pos + 9]);
    let len = u32::from_le_bytes(w);
    *pos += VIEW_SAVED;
    *v = match tag {
        0 => View::Empty,
        1 => View::Vault { off, len },
        _ => return false,
    };
    true
}
