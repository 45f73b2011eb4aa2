use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{
    core::{
        ResourceContents, ToolCall,
        protocol::{
            constants::{LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS},
            message::{JsonRpcRequest, JsonRpcResponse, RequestId},
            result::{
                EmptyResult, Implementation, InitializeResult, ListResourcesResult,
                ListToolsResult, ReadResourceResult,
            },
        },
    },
    error::{Error, Result},
    router::traits::Router,
};

/// Request-level handlers shared by every [`Router`].
#[async_trait]
pub trait RouterExt: Router {
    fn create_response(&self, id: Option<RequestId>) -> JsonRpcResponse {
        JsonRpcResponse::new_empty(id)
    }

    async fn handle_initialize(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let requested = req
            .params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let protocol_version = match requested {
            Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v.to_string(),
            _ => LATEST_PROTOCOL_VERSION.to_string(),
        };

        let result = InitializeResult {
            protocol_version,
            capabilities: self.capabilities(),
            server_info: Implementation {
                name: self.name(),
                version: self.version(),
            },
            instructions: Some(self.instructions()),
        };
        respond(req.id, &result)
    }

    async fn handle_ping(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        respond(req.id, &EmptyResult::default())
    }

    async fn handle_tools_list(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let result = ListToolsResult {
            tools: self.list_tools(),
            next_cursor: None,
        };
        respond(req.id, &result)
    }

    async fn handle_tools_call(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let params = req
            .params
            .ok_or_else(|| Error::InvalidParameters("Missing tools/call parameters".into()))?;
        let call: ToolCall = serde_json::from_value(params)
            .map_err(|e| Error::InvalidParameters(format!("Invalid tools/call parameters: {e}")))?;

        let result = self.call_tool(&call.name, call.arguments).await;
        respond(req.id, &result)
    }

    async fn handle_resources_list(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let result = ListResourcesResult {
            resources: self.list_resources(),
            next_cursor: None,
        };
        respond(req.id, &result)
    }

    async fn handle_resources_read(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let uri = req
            .params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidParameters("Missing resource uri".into()))?
            .to_string();

        let text = self.read_resource(&uri).await?;
        let mime_type = self
            .list_resources()
            .into_iter()
            .find(|r| r.uri == uri)
            .and_then(|r| r.mime_type);

        let result = ReadResourceResult {
            contents: vec![ResourceContents::text(uri, mime_type, text)],
        };
        respond(req.id, &result)
    }
}

impl<T: Router + ?Sized> RouterExt for T {}

fn respond<T: Serialize>(id: Option<RequestId>, result: &T) -> Result<JsonRpcResponse> {
    Ok(JsonRpcResponse::with_result(id, serde_json::to_value(result)?))
}
