//! Allocation free HTTP/1.1 server and client for constrained targets.
//!
//! Every connection owns exactly one fixed-size buffer. The low end of the
//! buffer receives and parses wire bytes (the *scratch* area), the high end
//! persists the few strings that must outlive successive refills of the
//! scratch area (the *vault*). Which headers are recognized for a given
//! route is declared at build time, so the binary only contains the value
//! parsers that are actually used.
//!
//! The protocol core is `no_std`; the server loop and the companion client
//! sit behind the `server` and `client` features and use blocking sockets
//! from `std::net`.

// For tests we use std.
#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod util;
pub use util::escape_json;

mod out;
pub use out::Out;

mod error;
pub use error::{Error, Result};
pub(crate) use error::OVERFLOW;

pub mod vault;
pub use vault::{TransientVault, View};

pub mod proto;
pub use proto::code::Code;
pub use proto::header::Header;
pub use proto::method::{Method, MethodMask};
pub use proto::mime::MimeType;
pub use proto::reqline::HttpVersion;
pub use proto::Parsing;

pub mod path;

mod headers;
pub use headers::{AnswerHeaders, HeaderSet};

mod chunk;
pub use chunk::{ChunkedWriter, Dechunker};

pub mod stream;

#[cfg(feature = "std")]
pub mod net;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "client")]
pub mod client;
