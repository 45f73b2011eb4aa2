use async_trait::async_trait;

use crate::{core::protocol::message::JsonRpcMessage, error::Result};

/// A framed, bidirectional JSON-RPC channel to one client.
#[async_trait]
pub trait ServerTransport: Send {
    /// Next inbound request or notification; `None` once the peer hangs up.
    async fn read_message(&mut self) -> Option<Result<JsonRpcMessage>>;

    async fn write_message(&mut self, msg: JsonRpcMessage) -> Result<()>;

    /// Flushes pending output before the run loop returns.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
