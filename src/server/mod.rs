//! The server half: an accept loop handing connections to a fixed worker
//! pool, each worker running requests through a route table.

pub mod acceptor;
pub mod connection;
pub mod pool;
pub mod router;

pub use acceptor::Server;
pub use router::{Handler, Router};
