//! Node client boundary
//!
//! The console talks to a separate node-client process. Requests are
//! submitted with the id chosen by the correlator; everything coming back
//! is delivered as a [`NodeEvent`] through the event loop queue.

pub mod json;

use crate::api::{Request, Response, Update};
use crate::error::{CliResult, RemoteError};

pub use json::JsonNodeClient;

/// Something the node client sent back
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Reply { id: u64, response: Response },
    Error { id: u64, error: RemoteError },
    Push(Update),
    /// The connection is gone; no further events follow
    Closed,
}

/// Outgoing half of the node client connection
pub trait NodeClient {
    fn request(&mut self, id: u64, request: Request) -> CliResult<()>;
}
