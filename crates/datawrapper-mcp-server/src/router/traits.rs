use async_trait::async_trait;
use serde_json::Value;

use crate::{
    core::{CallToolResult, Resource, Tool, protocol::capabilities::ServerCapabilities},
    error::{Error, Result},
};

#[async_trait]
pub trait Router: Send + Sync {
    fn name(&self) -> String;

    fn version(&self) -> String;

    fn instructions(&self) -> String;

    fn capabilities(&self) -> ServerCapabilities;

    fn list_tools(&self) -> Vec<Tool>;

    /// Runs a tool. Tool failures are reported inside the result
    /// (`is_error`), never as a protocol error.
    async fn call_tool(&self, tool_name: &str, arguments: Value) -> CallToolResult;

    fn list_resources(&self) -> Vec<Resource> {
        vec![]
    }

    async fn read_resource(&self, uri: &str) -> Result<String> {
        Err(Error::ResourceNotFound(uri.to_string()))
    }
}
