use tracing::Instrument;

use crate::{
    core::protocol::{
        constants::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR},
        error::ErrorData,
        message::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse},
    },
    error::{Error, Result},
    router::{ext::RouterExt, traits::Router},
    transport::traits::ServerTransport,
};

pub struct Server {
    router: Box<dyn Router>,
}

impl Server {
    pub fn new(router: Box<dyn Router>) -> Self {
        Self { router }
    }

    pub async fn run(self, mut transport: impl ServerTransport) -> Result<()> {
        let router = &*self.router;

        tracing::info!(server = %router.name(), "Server started");
        while let Some(msg_result) = transport.read_message().await {
            match msg_result {
                Ok(msg) => {
                    Self::handle_message(router, &mut transport, msg).await?;
                }
                Err(e) => {
                    Self::handle_error(&mut transport, e).await?;
                }
            }
        }
        tracing::info!("Server transport closed, exiting run loop");

        transport.close().await
    }

    async fn handle_message(
        router: &dyn Router,
        transport: &mut impl ServerTransport,
        msg: JsonRpcMessage,
    ) -> Result<()> {
        match msg {
            JsonRpcMessage::Request(request) => {
                let response = Self::process_request(router, request).await;
                Self::send_response(transport, response).await?;
            }
            JsonRpcMessage::Notification(notification) => {
                tracing::debug!(method = %notification.method, "Notification received");
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::Nil | JsonRpcMessage::Error(_) => {
                tracing::debug!("Ignoring unsolicited client message");
            }
        }
        Ok(())
    }

    pub async fn process_request(router: &dyn Router, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let span = tracing::info_span!("request", method = %request.method, request_id = ?id);

        tracing::debug!(parent: &span, params = ?request.params, "Received request");

        let result = async {
            match request.method.as_str() {
                "initialize" => router.handle_initialize(request).await,
                "ping" => router.handle_ping(request).await,
                "tools/list" => router.handle_tools_list(request).await,
                "tools/call" => router.handle_tools_call(request).await,
                "resources/list" => router.handle_resources_list(request).await,
                "resources/read" => router.handle_resources_read(request).await,
                other => Err(Error::MethodNotFound(other.to_string())),
            }
        }
        .instrument(span)
        .await;

        match result {
            Ok(resp) => resp,
            Err(e) => {
                let code = match &e {
                    Error::MethodNotFound(_) => METHOD_NOT_FOUND,
                    Error::InvalidParameters(_) | Error::ResourceNotFound(_) => INVALID_PARAMS,
                    _ => INTERNAL_ERROR,
                };
                tracing::error!(error = %e, code, "Request processing failed");
                JsonRpcResponse::with_error(id, ErrorData::new(code, e.to_string()))
            }
        }
    }

    async fn send_response(
        transport: &mut impl ServerTransport,
        response: JsonRpcResponse,
    ) -> Result<()> {
        tracing::debug!(
            response_id = ?response.id,
            is_error = response.error.is_some(),
            "Sending response"
        );

        transport
            .write_message(JsonRpcMessage::Response(response))
            .await
    }

    async fn handle_error(transport: &mut impl ServerTransport, e: Error) -> Result<()> {
        // a broken stream cannot carry a reply
        if !e.is_client_fault() {
            tracing::error!(error = %e, "Transport failed");
            return Err(e);
        }
        let code = match e {
            Error::Json(_) | Error::InvalidMessage(_) | Error::Utf8(_) => PARSE_ERROR,
            Error::Protocol(_) => INVALID_REQUEST,
            _ => INTERNAL_ERROR,
        };
        tracing::warn!(error = %e, code, "Unreadable message");

        let error_response =
            JsonRpcMessage::Error(JsonRpcError::new(None, ErrorData::new(code, e.to_string())));

        transport.write_message(error_response).await
    }
}
