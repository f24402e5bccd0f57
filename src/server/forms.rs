//! Posted form decoding. The keys are known at build time; only the
//! values (views into the scratch area) are stored.

use crate::util::Span;
use crate::vault::{Scratch, View, ViewBytes};

/// The values of an `application/x-www-form-urlencoded` body, keyed by a
/// fixed key list:
///
/// ```no_run
/// # use wren::server::FormPost;
/// let mut form = FormPost::new(["name", "value"]);
/// // client.fetch_form(&headers, &mut form);
/// ```
///
/// Values are views into the connection buffer and live until the next
/// scratch mutation, i.e. for the duration of the handler.
pub struct FormPost<const K: usize> {
    keys: [&'static str; K],
    values: [View; K],
}

impl<const K: usize> FormPost<K> {
    pub fn new(keys: [&'static str; K]) -> FormPost<K> {
        FormPost {
            keys,
            values: [View::Empty; K],
        }
    }

    fn position(&self, key: &[u8]) -> Option<usize> {
        self.keys.iter().position(|k| k.as_bytes() == key)
    }

    /// The raw view for a key, empty when the key was missing.
    pub fn view(&self, key: &str) -> View {
        self.position(key.as_bytes())
            .map(|i| self.values[i])
            .unwrap_or(View::Empty)
    }

    /// The decoded value bytes for a key.
    pub fn value<'b>(&self, key: &str, src: &'b dyn ViewBytes) -> Option<&'b [u8]> {
        self.position(key.as_bytes())
            .filter(|i| !self.values[*i].is_empty())
            .map(|i| src.view_bytes(self.values[i]))
    }

    /// Split an already URL-decoded `key=value&...` body into the
    /// declared keys. Unknown keys are skipped.
    pub(crate) fn parse(&mut self, s: &Scratch<'_>, span: Span) {
        let b = s.bytes();
        let mut rest = span;
        while !rest.is_empty() {
            let key = rest.split_upto(b, b"=");
            if key.is_empty() {
                rest.split_upto(b, b"&");
                continue;
            }
            let value = rest.split_upto(b, b"&");
            if let Some(i) = self.position(key.slice(b)) {
                self.values[i] = s.view(value);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::TransientVault;

    #[test]
    fn splits_known_keys() {
        let mut buf: TransientVault<128> = TransientVault::new();
        buf.append(b"name=alice&junk=skip&age=7");

        let mut form = FormPost::new(["name", "age"]);
        let s = buf.scratch();
        form.parse(&s, Span::of(0..buf.len()));

        assert_eq!(form.value("name", &buf), Some(&b"alice"[..]));
        assert_eq!(form.value("age", &buf), Some(&b"7"[..]));
        assert_eq!(form.value("junk", &buf), None);
        assert_eq!(form.value("missing", &buf), None);
    }

    #[test]
    fn trailing_separator_is_fine() {
        let mut buf: TransientVault<128> = TransientVault::new();
        buf.append(b"name=alice&");

        let mut form = FormPost::new(["name"]);
        let s = buf.scratch();
        form.parse(&s, Span::of(0..buf.len()));
        assert_eq!(form.value("name", &buf), Some(&b"alice"[..]));
    }

    #[test]
    fn valueless_key_yields_empty() {
        let mut buf: TransientVault<128> = TransientVault::new();
        buf.append(b"flag=&x=1");

        let mut form = FormPost::new(["flag", "x"]);
        let s = buf.scratch();
        form.parse(&s, Span::of(0..buf.len()));
        assert!(form.view("flag").is_empty());
        assert_eq!(form.value("x", &buf), Some(&b"1"[..]));
    }
}
