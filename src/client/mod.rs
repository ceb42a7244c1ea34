//! The client half: a connection pool, an engine that drives one request to
//! completion over a pooled or fresh socket, and a session/builder pair on
//! top that application code actually calls.

pub mod builder;
pub mod engine;
pub mod pool;
pub mod session;

pub use builder::RequestBuilder;
pub use session::Session;
