use core::fmt;

/// Error type shared by the protocol core, the server and the client.
///
/// Every terminal error maps to exactly one close behavior on the server
/// side (reply-and-close or silent drop); recoverable conditions are not
/// errors and are expressed through [`crate::Parsing`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Malformed syntax in the request line or a header line.
    InvalidRequest,
    /// The scratch area filled up before the required delimiter arrived.
    EntityTooLarge,
    /// A recognized header carried a value its parser rejected.
    NotAcceptable,
    /// No route accepted the request.
    NotFound,
    /// Vault reservation or persistence failed.
    InternalError,
    /// The underlying transport failed.
    SocketError,
    /// The idle TTL expired.
    Timeout,
    /// Connecting or sending from the client side failed.
    Unavailable,
    /// The client was given a bad URL or exhausted its redirect budget.
    ClientRequest,
    /// An output buffer was too small for what had to be written.
    OutputOverflow,
    /// A chunked body had a malformed size line or missing CRLF.
    BadChunk,
}

pub type Result<T> = core::result::Result<T, Error>;

pub(crate) const OVERFLOW: Result<()> = Err(Error::OutputOverflow);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Error::InvalidRequest => "invalid request",
            Error::EntityTooLarge => "entity too large",
            Error::NotAcceptable => "header value not acceptable",
            Error::NotFound => "no route matched",
            Error::InternalError => "internal error",
            Error::SocketError => "socket error",
            Error::Timeout => "timed out",
            Error::Unavailable => "connect or send failed",
            Error::ClientRequest => "bad url or too many redirects",
            Error::OutputOverflow => "output too small to write output",
            Error::BadChunk => "malformed chunk",
        };
        write!(f, "{}", s)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
