//! A synchronous HTTP/1.1 toolkit: URL and header value types, a body
//! abstraction covering in-memory, file-streamed and multipart payloads, a
//! wire parser shared by both halves, a pooled blocking client, and a
//! threaded server with a small route table.
//!
//! The client and server each read and write the same `Request`/`Response`
//! message model; everything below that line (sockets, framing, transfer
//! coding, compression) is shared rather than duplicated per side.

pub mod body;
pub mod client;
pub mod compress;
pub mod config;
pub mod error;
pub mod headers;
pub mod message;
pub mod multipart;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;
pub mod socket;
pub mod url;

pub use body::Body;
pub use client::{RequestBuilder, Session};
pub use config::{ServerConfig, SessionConfig};
pub use error::{ClientError, ClientResult, Error, Result};
pub use headers::Headers;
pub use message::{Message, Version};
pub use request::{Method, Request};
pub use response::{Response, Status};
pub use server::{Handler, Router, Server};
pub use url::{Scheme, Url};
