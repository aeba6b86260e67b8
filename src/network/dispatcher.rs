// src/network/dispatcher.rs

use async_trait::async_trait;
use std::net::SocketAddr;

use crate::error::ProtocolError;

/// Server side of the line protocol. Implementations turn one request line
/// into exactly one response line and never fail: parse and authorization
/// errors are encoded into the response.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle_line(&self, line: &str, caller: SocketAddr) -> String;

    /// Response for a request that could not even be read as a line
    /// (oversized, not UTF-8).
    fn error_reply(&self, err: &ProtocolError) -> String;
}
