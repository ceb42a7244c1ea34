//! Per-connection read-parse-dispatch-write loop, repeated while the
//! connection is kept alive.
//!
//! Grounded on `rotor-http`'s server protocol (`request -> headers_received
//! -> request_received -> response`) collapsed into one blocking function,
//! since there is no reactor driving state transitions here — each
//! connection simply owns a worker thread for its lifetime.

use std::net::TcpStream;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::body::Body;
use crate::error::Error;
use crate::headers;
use crate::parser::{self, Limits};
use crate::request::Request;
use crate::response::{Response, Status};
use crate::server::router::Router;
use crate::url::Url;

/// Services `stream` until the peer disconnects or a request asks to
/// close the connection, dispatching each parsed request through `router`.
pub fn handle(mut stream: TcpStream, router: &Router, read_timeout: Duration, server_header: &str, limits: &Limits) {
    let peer = stream.peer_addr().ok();
    loop {
        if stream.set_read_timeout(Some(read_timeout)).is_err() {
            return;
        }

        let (method, target, _version, head, body) = match parser::read_request(&mut stream, limits) {
            Ok(parsed) => parsed,
            Err(Error::SocketRead(_)) => return,
            Err(e) => {
                warn!("failed to parse request from {peer:?}: {e}");
                write_error(&mut stream, Status(e.status_code()), server_header);
                return;
            }
        };

        let request_headers = parser::head_headers(&head).clone();
        let keep_alive = request_headers.connection_keep_alive();
        let body_bytes = match body.into_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to read request body from {peer:?}: {e}");
                write_error(&mut stream, Status(e.status_code()), server_header);
                return;
            }
        };

        let url = Url::from_request_target(request_headers.get(headers::HOST), &target);
        let mut request = Request::new(method, url);
        request.message.headers = request_headers;
        request.message.body = Body::from_bytes(body_bytes);
        trace!("parsed request from {peer:?}:\n{request}");

        let mut response = router.dispatch(&mut request);
        debug!("dispatched {} {} -> {} for {peer:?}", request.method.as_str(), request.url.path(), response.status.0);
        response.headers_mut().set(headers::SERVER, server_header.to_string());
        if !keep_alive {
            response.headers_mut().set(headers::CONNECTION, "close");
        }

        if response.write_to(&mut stream).is_err() {
            return;
        }

        if !keep_alive {
            return;
        }
    }
}

pub(crate) fn write_error(stream: &mut (impl std::io::Write + std::io::Read), status: Status, server_header: &str) {
    let mut response = Response::new(status);
    response.headers_mut().set(headers::SERVER, server_header.to_string());
    response.headers_mut().set(headers::CONNECTION, "close");
    let _ = response.write_to(stream);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Method;
    use crate::response::Status;
    use crate::server::router::{literal, regex};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn dispatches_and_closes_on_connection_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut router = Router::new();
        router.route(
            literal("/ping"),
            &[Method::Get],
            Box::new(|_| {
                let mut resp = Response::new(Status::OK);
                resp.set_body(crate::body::Body::from_bytes(b"pong".to_vec()), Some("text/plain"));
                Some(resp)
            }),
        );

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle(stream, &router, Duration::from_secs(2), "webcc-rs/test", &Limits::default());
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET /ping HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("pong"));

        server.join().unwrap();
    }

    #[test]
    fn regex_route_args_are_visible_to_the_view() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut router = Router::new();
        router.route(
            regex(r"/books/(\d+)").unwrap(),
            &[Method::Get],
            Box::new(|req| {
                let mut resp = Response::new(Status::OK);
                resp.set_body(crate::body::Body::from_bytes(req.args[0].clone().into_bytes()), None);
                Some(resp)
            }),
        );

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle(stream, &router, Duration::from_secs(2), "webcc-rs/test", &Limits::default());
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET /books/42 HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("42"));

        server.join().unwrap();
    }

    #[test]
    fn posting_a_book_creates_it_and_returns_201_with_its_id() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut router = Router::new();
        router.route(
            literal("/books"),
            &[Method::Post],
            Box::new(|req| {
                assert_eq!(req.body_bytes(), br#"{"name":"Adam","age":20}"#);
                let mut resp = Response::new(Status(201));
                resp.set_body(
                    crate::body::Body::from_bytes(br#"{"id":"1"}"#.to_vec()),
                    Some("application/json"),
                );
                Some(resp)
            }),
        );

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle(stream, &router, Duration::from_secs(2), "webcc-rs/test", &Limits::default());
        });

        let mut client = TcpStream::connect(addr).unwrap();
        let body = br#"{"name":"Adam","age":20}"#;
        let request = format!(
            "POST /books HTTP/1.1\r\nHost: x\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        client.write_all(request.as_bytes()).unwrap();
        client.write_all(body).unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(text.ends_with(r#"{"id":"1"}"#));

        server.join().unwrap();
    }
}
