//! The accept loop: binds a listener and hands each accepted connection to
//! the worker pool for the lifetime of the server.
//!
//! Grounded on the thread-pool chapter's `main` loop (`for stream in
//! listener.incoming() { pool.execute(...) }`), with the fixed-size job
//! queue from `server::pool` standing in for that chapter's unbounded
//! `mpsc` channel.

use std::net::{TcpListener, ToSocketAddrs};
use std::sync::Arc;

use log::{info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::server::connection;
use crate::server::pool::WorkerPool;
use crate::server::router::Router;

/// A bound listener plus the worker pool and route table servicing it.
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    pool: WorkerPool,
    config: ServerConfig,
}

impl Server {
    pub fn bind(addr: impl ToSocketAddrs, router: Router, config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(Error::Connect)?;
        let pool = WorkerPool::new(config.worker_count, config.max_queue_len);
        Ok(Server { listener, router: Arc::new(router), pool, config })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, dispatching each to the worker pool.
    /// Returns only if the listener itself errors out.
    pub fn serve(&self) -> Result<()> {
        info!("listening on {:?}", self.listener.local_addr());
        for incoming in self.listener.incoming() {
            let mut stream = match incoming {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("failed to accept connection: {e}");
                    continue;
                }
            };

            let server_header = self.config.server_header.clone();
            if !self.pool.has_capacity() {
                warn!("worker queue full, answering 503 and closing {:?}", stream.peer_addr().ok());
                connection::write_error(&mut stream, crate::response::Status::SERVICE_UNAVAILABLE, &server_header);
                continue;
            }

            let router = Arc::clone(&self.router);
            let read_timeout = self.config.read_timeout;
            let limits = self.config.limits();
            let job = Box::new(move || {
                connection::handle(stream, &router, read_timeout, &server_header, &limits);
            });

            if self.pool.submit(job).is_err() {
                warn!("worker queue became full between capacity check and submit, dropping connection");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Method;
    use crate::response::{Response, Status};
    use crate::server::router::literal;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn serves_a_registered_route() {
        let mut router = Router::new();
        router.route(
            literal("/hello"),
            &[Method::Get],
            Box::new(|_| {
                let mut resp = Response::new(Status::OK);
                resp.set_body(crate::body::Body::from_bytes(b"world".to_vec()), Some("text/plain"));
                Some(resp)
            }),
        );

        let mut config = ServerConfig::default();
        config.worker_count = 2;
        let server = Server::bind("127.0.0.1:0", router, config).unwrap();
        let addr = server.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let _ = server.serve();
        });

        thread::sleep(Duration::from_millis(50));
        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET /hello HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("200 OK"));
        assert!(text.ends_with("world"));

        drop(handle);
    }

    #[test]
    fn full_queue_answers_503_instead_of_silently_dropping() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let rx = Arc::new(Mutex::new(rx));
        let mut router = Router::new();
        router.route(
            literal("/block"),
            &[Method::Get],
            Box::new(move |_| {
                let _ = rx.lock().unwrap().recv();
                Some(Response::new(Status::OK))
            }),
        );

        let mut config = ServerConfig::default();
        config.worker_count = 1;
        config.max_queue_len = 1;
        let server = Server::bind("127.0.0.1:0", router, config).unwrap();
        let addr = server.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let _ = server.serve();
        });
        thread::sleep(Duration::from_millis(50));

        let mut occupies_worker = TcpStream::connect(addr).unwrap();
        occupies_worker
            .write_all(b"GET /block HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .unwrap();
        thread::sleep(Duration::from_millis(50));

        let mut occupies_queue = TcpStream::connect(addr).unwrap();
        occupies_queue
            .write_all(b"GET /block HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .unwrap();
        thread::sleep(Duration::from_millis(50));

        let mut rejected = TcpStream::connect(addr).unwrap();
        rejected
            .write_all(b"GET /block HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut buf = Vec::new();
        rejected.read_to_end(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));

        let _ = tx.send(());
        let _ = tx.send(());
        drop(occupies_worker);
        drop(occupies_queue);
        drop(handle);
    }
}
