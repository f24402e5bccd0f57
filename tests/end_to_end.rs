//! End-to-end scenarios: full requests in, full responses out, through
//! the real server loop. Most run over in-memory transports; one talks
//! TCP to itself.

use std::io::Write;

use wren::net::mem::{MemAcceptor, MemTransport};
use wren::server::{
    CaptureAnswer, Client, CodeAnswer, FormPost, Route, Router, Server, SimpleAnswer,
};
use wren::{Code, Header, HeaderSet, Method, MethodMask, MimeType};

type MemClient = Client<MemTransport, 1024>;
type MemServer = Server<MemAcceptor, 4, 5>;

fn root(client: &mut MemClient, _h: &mut HeaderSet) -> bool {
    client.send_answer(CodeAnswer::new(Code::Ok))
}

fn form(client: &mut MemClient, h: &mut HeaderSet) -> bool {
    let mut form = FormPost::new(["name"]);
    if !client.fetch_form(h, &mut form) {
        return client.reply_code(Code::BadRequest);
    }
    let ok = form.value("name", client.buffer()) == Some(&b"alice"[..]);
    client.send_answer(CodeAnswer::new(if ok { Code::Ok } else { Code::Conflict }))
}

fn chunked(client: &mut MemClient, _h: &mut HeaderSet) -> bool {
    let mut pieces: &[&[u8]] = &[b"ab", b"cde"];
    client.send_answer(CaptureAnswer::new(Code::Ok, move |tmp: &mut [u8]| {
        let Some((first, rest)) = pieces.split_first() else {
            return 0;
        };
        pieces = rest;
        tmp[..first.len()].copy_from_slice(first);
        first.len()
    }))
}

fn normalized(client: &mut MemClient, _h: &mut HeaderSet) -> bool {
    assert_eq!(client.request_path(), b"/b/c/d");
    assert_eq!(client.query().value_for(b"x"), Some(&b"1"[..]));
    client.send_answer(CodeAnswer::new(Code::Ok))
}

fn greet(client: &mut MemClient, _h: &mut HeaderSet) -> bool {
    client.keep_alive();
    client.send_answer(SimpleAnswer::new(Code::Ok, MimeType::TextPlain, b"hi"))
}

static ROUTES: &[Route<MemTransport>] = &[
    Route {
        methods: MethodMask::of(&[Method::Get, Method::Head]),
        path: "/greet",
        headers: &[],
        handler: greet,
    },
    Route {
        methods: MethodMask::of(&[Method::Post]),
        path: "/f",
        headers: &[],
        handler: form,
    },
    Route {
        methods: MethodMask::of(&[Method::Get]),
        path: "/chunks",
        headers: &[],
        handler: chunked,
    },
    Route {
        methods: MethodMask::of(&[Method::Get]),
        path: "/b/c/d",
        headers: &[],
        handler: normalized,
    },
    Route {
        methods: MethodMask::of(&[Method::Get, Method::Head]),
        path: "/",
        headers: &[Header::Host],
        handler: root,
    },
];

fn server() -> (MemServer, wren::net::mem::MemHandle) {
    let (acceptor, handle) = MemAcceptor::new();
    (Server::new(acceptor, Router::new(ROUTES)), handle)
}

/// Connect, send, tick until the peer produced output.
fn roundtrip(server: &mut MemServer, handle: &wren::net::mem::MemHandle, req: &[u8]) -> Vec<u8> {
    let mut conn = handle.connect();
    server.tick(0);
    conn.write_all(req).unwrap();
    let mut out = Vec::new();
    for _ in 0..16 {
        server.tick(0);
        out = conn.drain();
        if !out.is_empty() {
            break;
        }
    }
    out
}

#[test]
fn smallest_get() {
    let (mut server, handle) = server();
    let out = roundtrip(&mut server, &handle, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(
        out,
        b"HTTP/1.1 200 Ok\r\nConnection:close\r\nContent-Length:0\r\n\r\n"
    );
}

#[test]
fn unknown_path_is_404() {
    let (mut server, handle) = server();
    let out = roundtrip(&mut server, &handle, b"PUT /missing HTTP/1.1\r\nHost:x\r\n\r\n");
    assert!(
        out.starts_with(b"HTTP/1.1 404 Not Found\r\n"),
        "{:?}",
        String::from_utf8_lossy(&out)
    );
}

#[test]
fn oversize_header_block_is_413() {
    let (mut server, handle) = server();
    let mut req = b"GET / HTTP/1.1\r\nX-Stuff: ".to_vec();
    req.extend(std::iter::repeat(b'a').take(10 * 1024));
    req.extend_from_slice(b"\r\n\r\n");

    let mut conn = handle.connect();
    server.tick(0);
    conn.write_all(&req).unwrap();
    let mut out = Vec::new();
    for _ in 0..8 {
        server.tick(0);
        out = conn.drain();
        if !out.is_empty() {
            break;
        }
    }
    assert!(
        out.starts_with(b"HTTP/1.1 413 Entity Too Large\r\n"),
        "{:?}",
        String::from_utf8_lossy(&out)
    );
}

#[test]
fn form_post() {
    let (mut server, handle) = server();
    let out = roundtrip(
        &mut server,
        &handle,
        b"POST /f HTTP/1.1\r\nHost:x\r\nContent-Type:application/x-www-form-urlencoded\r\nContent-Length:11\r\n\r\nname=alice&",
    );
    assert!(
        out.starts_with(b"HTTP/1.1 200 Ok\r\n"),
        "{:?}",
        String::from_utf8_lossy(&out)
    );
}

#[test]
fn chunked_download() {
    let (mut server, handle) = server();
    let out = roundtrip(&mut server, &handle, b"GET /chunks HTTP/1.1\r\nHost:x\r\n\r\n");
    assert_eq!(
        out,
        b"HTTP/1.1 200 Ok\r\nConnection:close\r\nTransfer-Encoding:chunked\r\n\r\n2\r\nab\r\n3\r\ncde\r\n0\r\n"
    );
}

#[test]
fn path_normalization_reaches_the_router() {
    let (mut server, handle) = server();
    let out = roundtrip(
        &mut server,
        &handle,
        b"GET /a/../b/./c//d?x=1 HTTP/1.1\r\nHost:x\r\n\r\n",
    );
    assert!(
        out.starts_with(b"HTTP/1.1 200 Ok\r\n"),
        "{:?}",
        String::from_utf8_lossy(&out)
    );
}

#[test]
fn head_suppresses_the_body() {
    let (mut server, handle) = server();
    let out = roundtrip(&mut server, &handle, b"HEAD /greet HTTP/1.1\r\nHost:x\r\n\r\n");
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("Content-Length:2"), "{}", text);
    assert!(text.ends_with("\r\n\r\n"), "{}", text);
}

#[test]
fn keep_alive_serves_two_requests() {
    let (mut server, handle) = server();
    let mut conn = handle.connect();
    server.tick(0);

    conn.write_all(b"GET /greet HTTP/1.1\r\nHost:x\r\n\r\n").unwrap();
    server.tick(0);
    let first = conn.drain();
    let text = String::from_utf8_lossy(&first);
    assert!(!text.contains("Connection:close"), "{}", text);
    assert!(text.ends_with("hi"), "{}", text);
    assert_eq!(server.active_clients(), 1);

    conn.write_all(b"GET /greet HTTP/1.1\r\nHost:x\r\n\r\n").unwrap();
    server.tick(0);
    let second = conn.drain();
    assert!(String::from_utf8_lossy(&second).ends_with("hi"));
}

#[test]
fn over_tcp_with_the_companion_client() {
    use wren::client::{get, ResponseSink};
    use wren::net::{TcpAcceptor, TcpTransport};
    use wren::server::Client as TcpClient;

    fn tcp_root(client: &mut TcpClient<TcpTransport, 1024>, _h: &mut HeaderSet) -> bool {
        client.send_answer(SimpleAnswer::new(Code::Ok, MimeType::TextPlain, b"over tcp"))
    }
    static TCP_ROUTES: &[Route<TcpTransport>] = &[Route {
        methods: MethodMask::of(&[Method::Get]),
        path: "/",
        headers: &[Header::Host],
        handler: tcp_root,
    }];

    let acceptor = TcpAcceptor::bind(0).unwrap();
    let port = acceptor.local_port().unwrap();
    let mut server: Server<TcpAcceptor, 4, 5> = Server::new(acceptor, Router::new(TCP_ROUTES));

    let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let stop_worker = stop.clone();
    let worker = std::thread::spawn(move || {
        while !stop_worker.load(std::sync::atomic::Ordering::Relaxed) {
            server.tick(5);
        }
    });

    struct Collect(Vec<u8>, u16);
    impl ResponseSink for Collect {
        fn status(&mut self, code: u16) {
            self.1 = code;
        }
        fn body(&mut self, chunk: &[u8]) -> bool {
            self.0.extend_from_slice(chunk);
            true
        }
    }

    let mut sink = Collect(Vec::new(), 0);
    let url = format!("http://127.0.0.1:{}/", port);
    let code = get(&url, &mut sink).unwrap();
    assert_eq!(code, 200);
    assert_eq!(sink.1, 200);
    assert_eq!(sink.0, b"over tcp");

    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    worker.join().unwrap();
}
