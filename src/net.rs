//! Socket plumbing the core builds on: a blocking [`Transport`] trait
//! with a readiness probe, TCP implementations, and the fixed-capacity
//! readiness pool driving the server loop.
//!
//! TLS slots in by implementing [`Transport`] for the TLS stream type;
//! the plain build pays nothing for it.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use log::trace;

use crate::{Error, Result};

/// Readiness of one pollable endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Poll {
    Readable,
    Idle,
    /// The endpoint failed; reading from it will surface the error.
    Broken,
}

/// Outcome of one readiness sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Select {
    Success,
    Timeout,
    SocketError,
}

/// What a single non-blocking receive produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Recv {
    Data(usize),
    /// Nothing buffered right now.
    Idle,
    /// Peer closed the connection.
    Closed,
}

/// A connected byte stream. `recv` must not block when nothing is
/// buffered; `write_all` may block until the bytes are out.
pub trait Transport: io::Read + io::Write + 'static {
    fn poll_readable(&mut self) -> Poll;

    fn close(&mut self);

    fn peer(&self) -> Option<SocketAddr> {
        None
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<Recv> {
        match self.read(buf) {
            Ok(0) => Ok(Recv::Closed),
            Ok(n) => Ok(Recv::Data(n)),
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                Ok(Recv::Idle)
            }
            Err(_) => Err(Error::SocketError),
        }
    }
}

/// Plain TCP transport. Server-side sockets are non-blocking and driven
/// by the pool; client-side sockets block with a read timeout.
pub struct TcpTransport {
    stream: TcpStream,
    peer: Option<SocketAddr>,
}

impl TcpTransport {
    pub(crate) fn accepted(stream: TcpStream, peer: SocketAddr) -> io::Result<TcpTransport> {
        stream.set_nonblocking(true)?;
        let _ = stream.set_nodelay(true);
        Ok(TcpTransport {
            stream,
            peer: Some(peer),
        })
    }

    /// Blocking connect, for the client side.
    pub fn connect(host: &str, port: u16) -> io::Result<TcpTransport> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let _ = stream.set_nodelay(true);
        let peer = stream.peer_addr().ok();
        Ok(TcpTransport { stream, peer })
    }
}

impl io::Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl io::Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn poll_readable(&mut self) -> Poll {
        let mut probe = [0u8; 1];
        match self.stream.peek(&mut probe) {
            // A zero peek is a closed peer, which read() will report.
            Ok(_) => Poll::Readable,
            Err(e) if e.kind() == ErrorKind::WouldBlock => Poll::Idle,
            Err(_) => Poll::Broken,
        }
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

/// Produces connections for the server loop. Implemented for TCP below
/// and by in-memory pairs in tests.
pub trait Acceptor {
    type Conn: Transport;

    /// Like a socket readiness probe: may pre-accept one connection to
    /// find out, which then waits in [`Acceptor::take`].
    fn poll_readable(&mut self) -> Poll;

    fn take(&mut self) -> Option<Self::Conn>;
}

pub struct TcpAcceptor {
    listener: TcpListener,
    pending: Option<TcpTransport>,
}

impl TcpAcceptor {
    pub fn bind(port: u16) -> io::Result<TcpAcceptor> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        Ok(TcpAcceptor {
            listener,
            pending: None,
        })
    }

    pub fn local_port(&self) -> Option<u16> {
        self.listener.local_addr().ok().map(|a| a.port())
    }
}

impl Acceptor for TcpAcceptor {
    type Conn = TcpTransport;

    fn poll_readable(&mut self) -> Poll {
        if self.pending.is_some() {
            return Poll::Readable;
        }
        match self.listener.accept() {
            Ok((stream, peer)) => match TcpTransport::accepted(stream, peer) {
                Ok(t) => {
                    self.pending = Some(t);
                    Poll::Readable
                }
                Err(_) => Poll::Broken,
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => Poll::Idle,
            Err(_) => Poll::Broken,
        }
    }

    fn take(&mut self) -> Option<TcpTransport> {
        self.pending.take()
    }
}

/// Readiness pool over up to `N` caller tokens (N ≤ 32). Slot 0 is
/// conventionally the listener. Sockets stay owned by the caller; the
/// pool only asks about them through the probe callback.
pub struct SocketPool<const N: usize> {
    tokens: [u32; N],
    used: usize,
    mask: u32,
}

impl<const N: usize> SocketPool<N> {
    const SIZE_OK: () = assert!(N <= 32, "the readiness mask is 32 bits");

    pub fn new() -> SocketPool<N> {
        #[allow(clippy::let_unit_value)]
        let _ = Self::SIZE_OK;
        SocketPool {
            tokens: [0; N],
            used: 0,
            mask: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Append a token at the end of the pool.
    pub fn append(&mut self, token: u32) -> bool {
        if self.used == N {
            return false;
        }
        self.tokens[self.used] = token;
        self.used += 1;
        true
    }

    /// Remove a token, swapping the last slot in (and its readiness bit
    /// with it). Insertion order of the rest is preserved.
    pub fn remove(&mut self, token: u32) -> bool {
        let Some(i) = self.tokens[..self.used].iter().position(|t| *t == token) else {
            return false;
        };
        let last = self.used - 1;
        self.tokens[i] = self.tokens[last];
        let bit_last = self.mask & (1 << last) != 0;
        self.mask &= !(1 << last);
        if i != last {
            if bit_last {
                self.mask |= 1 << i;
            } else {
                self.mask &= !(1 << i);
            }
        }
        self.used -= 1;
        true
    }

    /// Probe every token until at least one is readable or the timeout
    /// passes. Resets and repopulates the readiness mask. Broken
    /// endpoints are reported readable so the subsequent read surfaces
    /// their error.
    pub fn select_active(
        &mut self,
        timeout_ms: u32,
        probe: &mut dyn FnMut(u32) -> Poll,
    ) -> Select {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        loop {
            self.mask = 0;
            for i in 0..self.used {
                match probe(self.tokens[i]) {
                    Poll::Readable | Poll::Broken => self.mask |= 1 << i,
                    Poll::Idle => {}
                }
            }
            if self.mask != 0 {
                trace!("select: mask {:#x}", self.mask);
                return Select::Success;
            }
            if Instant::now() >= deadline {
                return Select::Timeout;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// The next readable token at or after `start` (in insertion order),
    /// clearing its bit. Each token is reported at most once per select.
    pub fn next_readable(&mut self, start: usize) -> Option<u32> {
        if self.mask == 0 {
            return None;
        }
        for i in start..self.used {
            if self.mask & (1 << i) != 0 {
                self.mask ^= 1 << i;
                return Some(self.tokens[i]);
            }
        }
        None
    }

    /// Whether a given position (not token) is flagged readable.
    pub fn is_readable(&self, pos: usize) -> bool {
        self.mask & (1 << pos) != 0
    }
}

impl<const N: usize> Default for SocketPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory duplex transports and an acceptor over them. This is how
/// the whole server loop runs under test, and doubles as a harness for
/// driving the stack without sockets.
pub mod mem {
    use super::{Acceptor, Poll, Transport};
    use std::collections::VecDeque;
    use std::io::{self, ErrorKind, Read, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Pipe {
        buf: VecDeque<u8>,
        closed: bool,
    }

    /// One end of an in-memory connection.
    pub struct MemTransport {
        rx: Arc<Mutex<Pipe>>,
        tx: Arc<Mutex<Pipe>>,
    }

    /// A connected pair; bytes written to one end are read at the other.
    pub fn pair() -> (MemTransport, MemTransport) {
        let a = Arc::new(Mutex::new(Pipe::default()));
        let b = Arc::new(Mutex::new(Pipe::default()));
        (
            MemTransport {
                rx: a.clone(),
                tx: b.clone(),
            },
            MemTransport { rx: b, tx: a },
        )
    }

    impl MemTransport {
        /// Drain everything the peer has written so far.
        pub fn drain(&mut self) -> Vec<u8> {
            let mut p = self.rx.lock().unwrap();
            p.buf.drain(..).collect()
        }
    }

    impl Read for MemTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut p = self.rx.lock().unwrap();
            if p.buf.is_empty() {
                return if p.closed {
                    Ok(0)
                } else {
                    Err(ErrorKind::WouldBlock.into())
                };
            }
            let n = buf.len().min(p.buf.len());
            for b in buf.iter_mut().take(n) {
                *b = p.buf.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    impl Write for MemTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut p = self.tx.lock().unwrap();
            if p.closed {
                return Err(ErrorKind::BrokenPipe.into());
            }
            p.buf.extend(buf.iter().copied());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for MemTransport {
        fn poll_readable(&mut self) -> Poll {
            let p = self.rx.lock().unwrap();
            if !p.buf.is_empty() || p.closed {
                Poll::Readable
            } else {
                Poll::Idle
            }
        }

        fn close(&mut self) {
            self.rx.lock().unwrap().closed = true;
            self.tx.lock().unwrap().closed = true;
        }
    }

    impl Drop for MemTransport {
        fn drop(&mut self) {
            // Dropping an end reads as EOF on the other side.
            self.tx.lock().unwrap().closed = true;
        }
    }

    /// Acceptor fed by a [`MemHandle`] from the test side.
    pub struct MemAcceptor {
        incoming: Arc<Mutex<VecDeque<MemTransport>>>,
    }

    #[derive(Clone)]
    pub struct MemHandle {
        incoming: Arc<Mutex<VecDeque<MemTransport>>>,
    }

    impl MemAcceptor {
        pub fn new() -> (MemAcceptor, MemHandle) {
            let incoming = Arc::new(Mutex::new(VecDeque::new()));
            (
                MemAcceptor {
                    incoming: incoming.clone(),
                },
                MemHandle { incoming },
            )
        }
    }

    impl MemHandle {
        /// Open a new connection, returning the peer end.
        pub fn connect(&self) -> MemTransport {
            let (server_end, client_end) = pair();
            self.incoming.lock().unwrap().push_back(server_end);
            client_end
        }
    }

    impl Acceptor for MemAcceptor {
        type Conn = MemTransport;

        fn poll_readable(&mut self) -> Poll {
            if self.incoming.lock().unwrap().is_empty() {
                Poll::Idle
            } else {
                Poll::Readable
            }
        }

        fn take(&mut self) -> Option<MemTransport> {
            self.incoming.lock().unwrap().pop_front()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn readable_in_insertion_order() {
        let mut pool: SocketPool<8> = SocketPool::new();
        for t in [10, 11, 12, 13] {
            assert!(pool.append(t));
        }
        let sel = pool.select_active(0, &mut |t| {
            if t % 2 == 0 {
                Poll::Readable
            } else {
                Poll::Idle
            }
        });
        assert_eq!(sel, Select::Success);
        assert_eq!(pool.next_readable(0), Some(10));
        assert_eq!(pool.next_readable(0), Some(12));
        assert_eq!(pool.next_readable(0), None);
    }

    #[test]
    fn start_index_skips_earlier_slots() {
        let mut pool: SocketPool<4> = SocketPool::new();
        pool.append(0);
        pool.append(1);
        pool.select_active(0, &mut |_| Poll::Readable);
        // Slot 0 (the listener) is skipped, its bit stays set.
        assert_eq!(pool.next_readable(1), Some(1));
        assert_eq!(pool.next_readable(1), None);
        assert!(pool.is_readable(0));
    }

    #[test]
    fn timeout_when_nothing_ready() {
        let mut pool: SocketPool<4> = SocketPool::new();
        pool.append(7);
        let sel = pool.select_active(5, &mut |_| Poll::Idle);
        assert_eq!(sel, Select::Timeout);
        assert_eq!(pool.next_readable(0), None);
    }

    #[test]
    fn remove_swaps_with_last_and_keeps_bits() {
        let mut pool: SocketPool<8> = SocketPool::new();
        for t in [20, 21, 22, 23] {
            pool.append(t);
        }
        pool.select_active(0, &mut |t| {
            if t >= 22 {
                Poll::Readable
            } else {
                Poll::Idle
            }
        });
        // Removing 21 moves 23 (readable) into its slot.
        assert!(pool.remove(21));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.next_readable(0), Some(23));
        assert_eq!(pool.next_readable(0), Some(22));
        assert_eq!(pool.next_readable(0), None);
        assert!(!pool.remove(99));
    }

    #[test]
    fn full_pool_rejects_append() {
        let mut pool: SocketPool<2> = SocketPool::new();
        assert!(pool.append(1));
        assert!(pool.append(2));
        assert!(!pool.append(3));
    }
}
