//! Idle-connection pool keyed by `(scheme, host, port)`.
//!
//! The original source's `HttpClientPool` keeps at most one idle socket per
//! key and transparently retries a request once if the pooled socket turned
//! out to be stale (the peer closed it while it sat idle). This is the same
//! policy, reshaped from the teacher's `HashMap<IpAddr, Vec<Port<R>>>` shell
//! (never filled in) into a real `Mutex`-guarded map.

use std::collections::HashMap;
use std::sync::Mutex;

use log::trace;

use crate::socket::Socket;
use crate::url::Scheme;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    scheme_is_secure: bool,
    host: String,
    port: u16,
}

fn key_for(scheme: Scheme, host: &str, port: u16) -> Key {
    Key { scheme_is_secure: scheme.is_secure(), host: host.to_string(), port }
}

/// A pool of at most one idle connection per origin.
pub struct Pool {
    idle: Mutex<HashMap<Key, Socket>>,
}

impl Pool {
    pub fn new() -> Pool {
        Pool { idle: Mutex::new(HashMap::new()) }
    }

    /// Removes and returns the idle socket for this origin, if any.
    pub fn take(&self, scheme: Scheme, host: &str, port: u16) -> Option<Socket> {
        let found = self.idle.lock().unwrap().remove(&key_for(scheme, host, port));
        if found.is_some() {
            trace!("pool hit for {host}:{port}");
        } else {
            trace!("pool miss for {host}:{port}");
        }
        found
    }

    /// Stashes `socket` as the idle connection for this origin, replacing
    /// whatever was there (there is never more than one idle socket per
    /// origin in this implementation).
    pub fn put(&self, scheme: Scheme, host: &str, port: u16, socket: Socket) {
        trace!("returning idle socket for {host}:{port} to the pool");
        self.idle.lock().unwrap().insert(key_for(scheme, host, port), socket);
    }

    pub fn len(&self) -> usize {
        self.idle.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Pool {
    fn default() -> Self {
        Pool::new()
    }
}
