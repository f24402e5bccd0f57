//! Closed enumerations of the HTTP vocabulary and the value parsers that
//! go with them. Everything here is fixed at build time: each enum has a
//! sorted string table so lookup is a case-insensitive binary search, and
//! the `max-support` feature widens the tables without changing the wire
//! format.

pub mod code;
pub mod header;
pub mod method;
pub mod mime;
pub mod reqline;
pub mod token;
pub mod value;

/// Outcome of a parser that made progress without failing. Failures are
/// [`crate::Error::InvalidRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parsing {
    /// More elements (or more input) may follow.
    MoreData,
    /// The value or request is logically complete.
    EndOfRequest,
}

/// Shared surface of the wire vocabularies, so list values can be generic
/// over the element enum.
pub trait WireEnum: Copy {
    fn from_bytes(b: &[u8]) -> Option<Self>;
    fn as_str(self) -> &'static str;
    #[doc(hidden)]
    fn ordinal(self) -> u8;
    #[doc(hidden)]
    fn from_ordinal(o: u8) -> Option<Self>;
}

/// Declare an enum together with its canonical wire strings.
///
/// Variants MUST be declared sorted by their wire form (case folded); the
/// string table doubles as a binary search index. The discriminant is the
/// table position, which is what the vault serialization stores.
macro_rules! wire_enum {
    (
        $(#[$em:meta])*
        pub enum $name:ident {
            $( $(#[$vm:meta])* $variant:ident = $text:literal, )+
        }
    ) => {
        $(#[$em])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vm])* $variant, )+
        }

        impl $name {
            /// Every value, in wire-form sort order.
            pub const ALL: &'static [$name] = &[
                $( $(#[$vm])* $name::$variant, )+
            ];

            const TABLE: &'static [(&'static str, $name)] = &[
                $( $(#[$vm])* ($text, $name::$variant), )+
            ];

            /// The canonical wire form.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $(#[$vm])* $name::$variant => $text, )+
                }
            }

            /// Case-insensitive lookup of a wire form.
            pub fn from_bytes(b: &[u8]) -> Option<$name> {
                $name::TABLE
                    .binary_search_by(|(s, _)| crate::util::cmp_ignore_case(s.as_bytes(), b))
                    .ok()
                    .map(|i| $name::TABLE[i].1)
            }

            pub(crate) fn ordinal(self) -> u8 {
                self as u8
            }

            pub(crate) fn from_ordinal(o: u8) -> Option<$name> {
                $name::ALL.get(o as usize).copied()
            }
        }

        impl crate::proto::WireEnum for $name {
            fn from_bytes(b: &[u8]) -> Option<Self> {
                $name::from_bytes(b)
            }

            fn as_str(self) -> &'static str {
                $name::as_str(self)
            }

            fn ordinal(self) -> u8 {
                $name::ordinal(self)
            }

            fn from_ordinal(o: u8) -> Option<Self> {
                $name::from_ordinal(o)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
pub(crate) use wire_enum;

#[cfg(test)]
pub(crate) fn assert_table_sorted(names: &[&str]) {
    for w in names.windows(2) {
        assert!(
            crate::util::cmp_ignore_case(w[0].as_bytes(), w[1].as_bytes()).is_lt(),
            "{} >= {}",
            w[0],
            w[1]
        );
    }
}
