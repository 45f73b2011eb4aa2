use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{
    core::{protocol::message::JsonRpcMessage, utils::parse_json_rpc_message},
    error::{Error, Result},
    transport::traits::ServerTransport,
};

const BUFFER_CAPACITY: usize = 2 * 1024 * 1024;

/// Newline-delimited JSON-RPC over a pair of byte streams (stdin/stdout in production).
pub struct ByteTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    buf: Vec<u8>,
}

impl<R, W> ByteTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::with_capacity(BUFFER_CAPACITY, reader),
            writer,
            buf: Vec::with_capacity(BUFFER_CAPACITY),
        }
    }
}

#[async_trait]
impl<R, W> ServerTransport for ByteTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_message(&mut self) -> Option<Result<JsonRpcMessage>> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) => {
                    tracing::info!("Client closed connection (read 0 bytes)");
                    return None;
                }
                Ok(_) => {
                    let line = match String::from_utf8(std::mem::take(&mut self.buf)) {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!(?e, "Invalid UTF-8 line");
                            return Some(Err(Error::Utf8(e)));
                        }
                    };
                    // blank keep-alive lines
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some(parse_json_rpc_message(line.trim_end()));
                }
                Err(e) => return Some(Err(Error::Io(e))),
            }
        }
    }

    async fn write_message(&mut self, msg: JsonRpcMessage) -> Result<()> {
        let json = serde_json::to_string(&msg)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
