//! Drives a single request over a pooled or freshly connected socket.
//!
//! Grounded on `webcc::HttpClient::Request`: pull a socket from the pool,
//! write the request, read the response racing a deadline; if the pooled
//! socket turns out to be stale (the peer already closed it), retry once on
//! a fresh connection rather than surfacing the error. The deadline race
//! itself is `socket::Socket::read_with_deadline`, the single-threaded
//! cooperative driver the design notes call for in place of the teacher's
//! reactor.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::client::pool::Pool;
use crate::error::{ClientError, ClientResult, Error};
use crate::parser;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::socket::Socket;

/// Runs `request` to completion, returning the parsed response.
///
/// `pool` supplies (and, on success with a keep-alive response, receives
/// back) the idle socket for the request's origin.
pub fn send(pool: &Pool, request: &mut Request, connect_timeout: Duration, read_timeout: Duration) -> ClientResult<Response> {
    request.finalize_body().map_err(ClientError::new)?;

    let scheme = request.url.scheme();
    let host = request.url.host().to_string();
    let port = request.url.port();

    let client_wants_keep_alive = request.keep_alive;

    match pool.take(scheme, &host, port) {
        Some(socket) => match run_once(socket, request, read_timeout) {
            Ok(outcome) => finish(pool, scheme, &host, port, outcome, client_wants_keep_alive),
            Err(e) if is_stale_connection(&e) => {
                let socket = Socket::connect(scheme, &host, port, connect_timeout, request.ssl_verify)
                    .map_err(ClientError::new)?;
                let outcome = run_once(socket, request, read_timeout).map_err(ClientError::new)?;
                finish(pool, scheme, &host, port, outcome, client_wants_keep_alive)
            }
            Err(e) => Err(ClientError::new(e)),
        },
        None => {
            let socket = Socket::connect(scheme, &host, port, connect_timeout, request.ssl_verify)
                .map_err(ClientError::new)?;
            let outcome = run_once(socket, request, read_timeout).map_err(ClientError::new)?;
            finish(pool, scheme, &host, port, outcome, client_wants_keep_alive)
        }
    }
}

struct Outcome {
    socket: Socket,
    response: Response,
}

fn run_once(mut socket: Socket, request: &mut Request, read_timeout: Duration) -> Result<Outcome, Error> {
    request.write_to(&mut socket)?;

    let deadline = Instant::now() + read_timeout;
    socket.set_read_timeout(Some(read_timeout))?;

    // Prime the deadline race: a zero-byte peek lets a genuinely dead
    // socket fail fast as `Timeout` before the full parser runs.
    let mut probe = [0u8; 1];
    match socket.read_with_deadline(&mut probe, deadline) {
        Ok(0) => return Err(Error::SocketRead(io::Error::from(io::ErrorKind::ConnectionReset))),
        Ok(_) => {}
        Err(e) => return Err(e),
    }

    let mut prefixed = PrefixedReader { prefix: Some(probe[0]), inner: &mut socket };
    let response_to_head = request.method == Method::Head;
    let limits = parser::Limits::default();

    let (version, status, reason, head, body, file_body) = match &request.stream_response_to {
        Some(path) => {
            let (version, status, reason, head, body) =
                parser::read_response_to_file(&mut prefixed, response_to_head, &limits, path)?;
            (version, status, reason, head, body, Some(path.clone()))
        }
        None => {
            let (version, status, reason, head, body) =
                parser::read_response(&mut prefixed, response_to_head, &limits)?;
            (version, status, reason, head, body, None)
        }
    };

    let mut response = Response::new(status);
    response.version = version;
    response.reason = if reason.is_empty() { None } else { Some(reason) };
    response.message.headers = parser::head_headers(&head).clone();
    response.message.body = body;
    response.file_body = file_body;

    Ok(Outcome { socket, response })
}

/// Retains the socket only when both sides wanted keep-alive: the client
/// didn't send `Connection: close` on the request, and the response
/// doesn't carry `Connection: close` either (authoritative per §9's
/// resolved open question, regardless of where in the response it
/// appears).
fn finish(
    pool: &Pool,
    scheme: crate::url::Scheme,
    host: &str,
    port: u16,
    outcome: Outcome,
    client_wants_keep_alive: bool,
) -> ClientResult<Response> {
    if client_wants_keep_alive && outcome.response.headers().connection_keep_alive() {
        pool.put(scheme, host, port, outcome.socket);
    }
    Ok(outcome.response)
}

/// Wraps a socket to re-deliver one already-read byte ahead of the rest of
/// the stream, so the connection-liveness probe doesn't lose data.
struct PrefixedReader<'a> {
    prefix: Option<u8>,
    inner: &'a mut Socket,
}

impl io::Read for PrefixedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.prefix.take() {
            buf[0] = byte;
            return Ok(1);
        }
        self.inner.read(buf)
    }
}

/// A pooled socket that the peer already closed surfaces as a read error or
/// an immediate EOF; either is treated as staleness worth retrying once.
fn is_stale_connection(err: &Error) -> bool {
    matches!(err, Error::SocketRead(_))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Method;
    use crate::url::Url;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn sends_request_and_reads_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            use std::io::Read;
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).unwrap();
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi")
                .unwrap();
        });

        let pool = Pool::new();
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let mut request = Request::new(Method::Get, url);
        let response = send(&pool, &mut request, Duration::from_secs(2), Duration::from_secs(2)).unwrap();
        assert_eq!(response.status, crate::response::Status::OK);
        assert_eq!(response.into_body_bytes().unwrap(), b"hi");
        server.join().unwrap();
    }
}
