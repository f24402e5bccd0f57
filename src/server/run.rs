//! The single-threaded server loop: one readiness sweep per tick, serve
//! readable clients in insertion order, accept into a free slot, age the
//! idle ones.

use log::{debug, info, warn};

use crate::net::{Acceptor, Recv, Select, SocketPool, TcpAcceptor, TcpTransport};
use crate::server::client::{Client, Status};
use crate::server::route::Router;
use crate::Code;

/// The server: a fixed array of client slots, a listener, and the
/// readiness pool tying them together. `SOCKETS` must be `CLIENTS + 1`
/// (slot 0 is the listener); it is a separate parameter only because
/// const generic arithmetic cannot express it yet.
pub struct Server<A: Acceptor, const CLIENTS: usize, const SOCKETS: usize, const BUF: usize = 1024>
{
    acceptor: A,
    router: Router<A::Conn, BUF>,
    clients: [Client<A::Conn, BUF>; CLIENTS],
    pool: SocketPool<SOCKETS>,
}

impl<A: Acceptor, const CLIENTS: usize, const SOCKETS: usize, const BUF: usize>
    Server<A, CLIENTS, SOCKETS, BUF>
{
    pub fn new(acceptor: A, router: Router<A::Conn, BUF>) -> Self {
        assert!(SOCKETS == CLIENTS + 1, "need one pool slot per client plus the listener");
        let mut pool = SocketPool::new();
        pool.append(0);
        Server {
            acceptor,
            router,
            clients: core::array::from_fn(|_| Client::new()),
            pool,
        }
    }

    /// How many slots currently hold a connection.
    pub fn active_clients(&self) -> usize {
        self.clients.iter().filter(|c| c.is_valid()).count()
    }

    /// One sweep: wait up to `timeout_ms` for readiness, serve whatever
    /// became readable, accept a pending connection, age the rest. The
    /// caller runs this forever.
    pub fn tick(&mut self, timeout_ms: u32) -> Select {
        let sel = {
            let acceptor = &mut self.acceptor;
            let clients = &mut self.clients;
            self.pool.select_active(timeout_ms, &mut |token| {
                if token == 0 {
                    acceptor.poll_readable()
                } else {
                    clients[(token - 1) as usize].poll()
                }
            })
        };

        let mut served = [false; CLIENTS];

        if sel == Select::Success {
            while let Some(token) = self.pool.next_readable(1) {
                let i = (token - 1) as usize;
                served[i] = true;
                self.serve(i);
                if !self.clients[i].is_valid() {
                    self.pool.remove(token);
                }
            }

            if self.pool.is_readable(0) {
                self.accept_new();
            }
        }

        self.age_idle(&served);
        sel
    }

    fn serve(&mut self, i: usize) {
        let client = &mut self.clients[i];

        if client.buf.free() == 0 {
            // A previous round filled the buffer and nothing consumed it.
            client.close_with_error(Code::EntityTooLarge);
            return;
        }

        match client.receive() {
            Ok(Recv::Data(n)) => client.stored(n),
            Ok(Recv::Idle) => return,
            Ok(Recv::Closed) => {
                debug!("peer closed slot {}", i);
                client.close();
                return;
            }
            Err(_) => {
                client.close_with_error(Code::BadRequest);
                return;
            }
        }

        if !client.parse() {
            return;
        }
        if client.status() > Status::RecvHeaders {
            // Done and Error slots either rearmed for keep-alive or
            // died; the caller sweeps dead tokens from the pool.
            let _ = self.router.process(client);
        }
    }

    fn accept_new(&mut self) {
        // Find a free slot first; without one the connection stays
        // pending until the next sweep.
        let Some(i) = self.clients.iter().position(|c| !c.is_valid()) else {
            debug!("all client slots busy");
            return;
        };
        let Some(conn) = self.acceptor.take() else {
            return;
        };
        self.clients[i].attach(conn);
        if !self.pool.append((i + 1) as u32) {
            warn!("readiness pool full, dropping fresh connection");
            self.clients[i].close();
            return;
        }
        debug!("accepted client into slot {}", i);
    }

    fn age_idle(&mut self, served: &[bool; CLIENTS]) {
        for i in 0..CLIENTS {
            if self.clients[i].is_valid() && !served[i] && !self.clients[i].tick_idle() {
                self.pool.remove((i + 1) as u32);
            }
        }
    }
}

impl<const CLIENTS: usize, const SOCKETS: usize, const BUF: usize>
    Server<TcpAcceptor, CLIENTS, SOCKETS, BUF>
{
    /// Listen on a TCP port.
    pub fn create(
        port: u16,
        router: Router<TcpTransport, BUF>,
    ) -> std::io::Result<Self> {
        let acceptor = TcpAcceptor::bind(port)?;
        info!(
            "HTTP server listening on port {}",
            acceptor.local_port().unwrap_or(port)
        );
        Ok(Server::new(acceptor, router))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::net::mem::{MemAcceptor, MemTransport};
    use crate::server::{CodeAnswer, Route};
    use crate::{Header, HeaderSet, Method, MethodMask};
    use std::io::Write;

    fn ok_handler(
        client: &mut Client<MemTransport, 1024>,
        _h: &mut HeaderSet,
    ) -> bool {
        client.send_answer(CodeAnswer::new(Code::Ok))
    }

    static ROUTES: &[Route<MemTransport>] = &[Route {
        methods: MethodMask::of(&[Method::Get]),
        path: "/",
        headers: &[Header::Host],
        handler: ok_handler,
    }];

    #[test]
    fn accepts_and_serves_one_request() {
        let (acceptor, handle) = MemAcceptor::new();
        let mut server: Server<MemAcceptor, 4, 5> = Server::new(acceptor, Router::new(ROUTES));

        let mut conn = handle.connect();
        // First tick accepts, second reads and answers.
        server.tick(0);
        assert_eq!(server.active_clients(), 1);

        conn.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        server.tick(0);

        let out = conn.drain();
        assert_eq!(
            out,
            b"HTTP/1.1 200 Ok\r\nConnection:close\r\nContent-Length:0\r\n\r\n"
        );
        assert_eq!(server.active_clients(), 0);
    }

    #[test]
    fn serves_clients_in_insertion_order() {
        let (acceptor, handle) = MemAcceptor::new();
        let mut server: Server<MemAcceptor, 4, 5> = Server::new(acceptor, Router::new(ROUTES));

        let mut c1 = handle.connect();
        server.tick(0);
        let mut c2 = handle.connect();
        server.tick(0);
        assert_eq!(server.active_clients(), 2);

        c1.write_all(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
        c2.write_all(b"GET / HTTP/1.1\r\nHost: b\r\n\r\n").unwrap();
        server.tick(0);

        assert!(c1.drain().starts_with(b"HTTP/1.1 200 Ok"));
        assert!(c2.drain().starts_with(b"HTTP/1.1 200 Ok"));
    }

    #[test]
    fn no_free_slot_leaves_connection_pending() {
        let (acceptor, handle) = MemAcceptor::new();
        let mut server: Server<MemAcceptor, 1, 2> = Server::new(acceptor, Router::new(ROUTES));

        let mut busy = handle.connect();
        server.tick(0);
        assert_eq!(server.active_clients(), 1);

        let mut waiting = handle.connect();
        server.tick(0);
        // Only one slot; the second connection is still pending.
        assert_eq!(server.active_clients(), 1);

        // Finishing the first request frees the slot.
        busy.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        server.tick(0);
        server.tick(0);
        assert_eq!(server.active_clients(), 1);

        waiting
            .write_all(b"GET / HTTP/1.1\r\nHost: y\r\n\r\n")
            .unwrap();
        server.tick(0);
        assert!(waiting.drain().starts_with(b"HTTP/1.1 200 Ok"));
    }

    #[test]
    fn peer_disconnect_frees_the_slot() {
        let (acceptor, handle) = MemAcceptor::new();
        let mut server: Server<MemAcceptor, 2, 3> = Server::new(acceptor, Router::new(ROUTES));

        let conn = handle.connect();
        server.tick(0);
        assert_eq!(server.active_clients(), 1);

        drop(conn);
        server.tick(0);
        assert_eq!(server.active_clients(), 0);
    }
}
