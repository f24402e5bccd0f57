//! Routing. Routes are a static table evaluated in declaration order;
//! the first one whose method mask and path prefix accept the request
//! parses the headers it declared interest in and runs its handler.

use log::{debug, trace};

use crate::headers::HeaderSet;
use crate::net::Transport;
use crate::proto::reqline::{next_header_line, HeaderLine};
use crate::server::client::{Client, ClientState, Status};
use crate::util::Span;
use crate::{Code, Header, Method, MethodMask};

/// A route callback. Returning false without having sent anything turns
/// into a 500 for the peer.
pub type Handler<T, const N: usize> = fn(&mut Client<T, N>, &mut HeaderSet) -> bool;

/// One routing table entry. An empty path is the wildcard (matches any
/// target, typically for file serving); otherwise matching is prefix
/// equality on the normalized target.
pub struct Route<T: Transport, const N: usize = 1024> {
    pub methods: MethodMask,
    pub path: &'static str,
    pub headers: &'static [Header],
    pub handler: Handler<T, N>,
}

impl<T: Transport, const N: usize> Route<T, N> {
    fn accepts(&self, client: &Client<T, N>) -> bool {
        let Some(m) = client.method() else {
            return false;
        };
        if !self.methods.contains(m) {
            return false;
        }
        self.path.is_empty() || client.request_target().starts_with(self.path.as_bytes())
    }

    fn parse(&self, client: &mut Client<T, N>) -> ClientState {
        let with_body = self
            .methods
            .intersects(MethodMask::of(&[Method::Post, Method::Put]));
        let mut headers = HeaderSet::for_route(self.headers, with_body);

        let fresh = client.status() == Status::HeadersDone && !client.has_persisted_headers();
        let (state, err) = if fresh {
            parse_block(client, &mut headers)
        } else {
            client.route_found(&mut headers);
            parse_incremental(client, &mut headers)
        };

        if let Some(code) = err {
            client.close_with_error(code);
            return ClientState::Error;
        }

        match state {
            ClientState::NeedRefill => client.save_headers(&headers),
            ClientState::Processing => {
                trace!("route {:?} runs", self.path);
                if (self.handler)(client, &mut headers) {
                    ClientState::Done
                } else {
                    // A handler failing before sending anything still
                    // owes the peer an answer.
                    if !client.responded() {
                        client.close_with_error(Code::InternalServerError);
                    }
                    ClientState::Error
                }
            }
            s => s,
        }
    }
}

/// The routing table. Static, immutable, first match wins.
pub struct Router<T: Transport, const N: usize = 1024> {
    routes: &'static [Route<T, N>],
}

impl<T: Transport, const N: usize> Router<T, N> {
    pub const fn new(routes: &'static [Route<T, N>]) -> Router<T, N> {
        Router { routes }
    }

    /// Dispatch a client whose parse got past the header receive state.
    pub fn process(&self, client: &mut Client<T, N>) -> ClientState {
        if client.status() < Status::NeedRefillHeaders {
            return ClientState::Error;
        }
        for route in self.routes {
            if route.accepts(client) {
                return route.parse(client);
            }
        }
        debug!(
            "no route for {}",
            String::from_utf8_lossy(client.request_path())
        );
        client.close_with_error(Code::NotFound);
        ClientState::Error
    }
}

/// Normal mode: the whole header block is in the scratch area. Parse it
/// in one sweep, persist the recognized values, drop the block.
fn parse_block<T: Transport, const N: usize>(
    client: &mut Client<T, N>,
    headers: &mut HeaderSet,
) -> (ClientState, Option<Code>) {
    let mut block_end = 0;
    {
        let s = client.buf.scratch();
        let b = s.bytes();
        let mut input = Span::of(0..b.len());
        loop {
            match next_header_line(b, &mut input) {
                Ok(HeaderLine::End) => {
                    block_end = input.start;
                    break;
                }
                Ok(HeaderLine::Field { name, value }) => {
                    if headers.accept(name.slice(b)).is_some() {
                        let mut value = value;
                        if headers.accept_and_parse(name.slice(b), &s, &mut value).is_err() {
                            return (ClientState::Error, Some(Code::NotAcceptable));
                        }
                    }
                    // Unrecognized names are skipped silently.
                }
                Ok(HeaderLine::Incomplete) | Err(_) => {
                    return (ClientState::Error, Some(Code::BadRequest));
                }
            }
        }
    }

    // The parsed values still point into the block; move them to the
    // vault so the body can take over the scratch area.
    if !headers.persist_all(&mut client.buf) {
        return (ClientState::Error, Some(Code::InternalServerError));
    }
    client.buf.drop_front(block_end);
    (ClientState::Processing, None)
}

/// Persist mode: the block is incomplete. Parse line by line, pushing
/// each value's strings into the vault and dropping consumed input, so
/// the next refill has room.
fn parse_incremental<T: Transport, const N: usize>(
    client: &mut Client<T, N>,
    headers: &mut HeaderSet,
) -> (ClientState, Option<Code>) {
    enum Step {
        Refill(usize),
        Done(usize),
        Advance(usize),
        Persist { slot: usize, after: usize },
    }

    let mut pos = 0;
    loop {
        let step = {
            let s = client.buf.scratch();
            let b = s.bytes();
            let mut input = Span::of(pos..b.len());
            match next_header_line(b, &mut input) {
                Ok(HeaderLine::Incomplete) => Step::Refill(input.start),
                Ok(HeaderLine::End) => Step::Done(input.start),
                Ok(HeaderLine::Field { name, value }) => match headers.index_of(name.slice(b)) {
                    None => Step::Advance(input.start),
                    Some(i) => {
                        let mut value = value;
                        if headers.parse_at(i, &s, &mut value).is_err() {
                            return (ClientState::Error, Some(Code::NotAcceptable));
                        }
                        if headers.slot_needs_persist(i) {
                            Step::Persist {
                                slot: i,
                                after: input.start,
                            }
                        } else {
                            Step::Advance(input.start)
                        }
                    }
                },
                Err(_) => return (ClientState::Error, Some(Code::BadRequest)),
            }
        };

        match step {
            Step::Refill(at) => {
                client.buf.drop_front(at);
                if client.buf.free() == 0 {
                    // Nothing got consumed and the buffer is full: a
                    // refill cannot make progress.
                    return (ClientState::Error, Some(Code::EntityTooLarge));
                }
                return (ClientState::NeedRefill, None);
            }
            Step::Done(at) => {
                client.buf.drop_front(at);
                return (ClientState::Processing, None);
            }
            Step::Advance(at) => pos = at,
            Step::Persist { slot, after } => {
                if !headers.persist_slot(&mut client.buf, slot, after) {
                    return (ClientState::Error, Some(Code::InternalServerError));
                }
                // The drop shifted everything parsed so far out.
                pos = 0;
            }
        }
    }
}
