use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, time::Instant};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use futures::FutureExt;
use serde_json::{Value, json};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    args::{self, CreateArgs, ExportArgs, UpdateArgs},
    client::ChartClient,
    core::{CallToolResult, Resource, Tool, content::Content, protocol::capabilities::ServerCapabilities},
    error::{ChartError, ErrorKind},
    handlers::ChartOperations,
    outcome::{OperationResult, Outcome},
    registry::ChartTypeRegistry,
    server::{CapabilitiesBuilder, Router},
};

pub const CHART_TYPES_URI: &str = "datawrapper://chart-types";

const DATA_DESCRIPTION: &str = "Chart data in one of three formats:\n\
    1. List of records (recommended): [{\"col1\": val1, \"col2\": val2}, ...]\n\
    2. Dict of arrays: {\"col1\": [val1, val2], \"col2\": [val3, val4]}\n\
    3. JSON string in either format above\n\
    File paths and raw CSV text are rejected.";

/// Exposes the chart operations as MCP tools and the chart-type catalog as a resource.
#[derive(Clone)]
pub struct ChartRouter {
    operations: ChartOperations,
}

impl ChartRouter {
    pub fn new(client: Arc<dyn ChartClient>) -> Self {
        Self {
            operations: ChartOperations::new(client),
        }
    }

    pub fn operations(&self) -> &ChartOperations {
        &self.operations
    }

    /// Parses the arguments of `tool_name` and runs the matching handler.
    pub async fn dispatch(&self, tool_name: &str, arguments: Value) -> OperationResult {
        let ops = &self.operations;
        match tool_name {
            "create_chart" => ops.create_chart(CreateArgs::parse(arguments)?).await.map(Outcome::from),
            "update_chart" => ops.update_chart(UpdateArgs::parse(arguments)?).await.map(Outcome::from),
            "publish_chart" => {
                let chart_id = args::chart_id(tool_name, arguments)?;
                ops.publish_chart(&chart_id).await.map(Outcome::from)
            }
            "get_chart" => {
                let chart_id = args::chart_id(tool_name, arguments)?;
                ops.get_chart(&chart_id).await.map(Outcome::from)
            }
            "delete_chart" => {
                let chart_id = args::chart_id(tool_name, arguments)?;
                ops.delete_chart(&chart_id).await.map(Outcome::from)
            }
            "export_chart_png" => ops
                .export_chart_png(ExportArgs::parse(arguments)?)
                .await
                .map(Outcome::from),
            "get_chart_schema" => {
                let chart_type = args::chart_type(tool_name, arguments)?;
                ops.chart_schema(&chart_type).map(Outcome::from)
            }
            other => Err(ChartError::InvalidArguments(format!("unknown tool '{other}'"))),
        }
    }
}

#[async_trait]
impl Router for ChartRouter {
    fn name(&self) -> String {
        "datawrapper-mcp".to_string()
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn instructions(&self) -> String {
        "Create, update, publish, export and delete Datawrapper charts. \
         Call get_chart_schema before create_chart to see the fields a chart type accepts. \
         Only publish or export a chart when the user explicitly asks for it."
            .to_string()
    }

    fn capabilities(&self) -> ServerCapabilities {
        CapabilitiesBuilder::new()
            .with_tools(false)
            .with_resources(false, false)
            .build()
    }

    fn list_tools(&self) -> Vec<Tool> {
        tools()
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> CallToolResult {
        let correlation_id = Uuid::new_v4();
        let span = tracing::info_span!("tool_call", tool = tool_name, %correlation_id);
        let start = Instant::now();

        let result = AssertUnwindSafe(self.dispatch(tool_name, arguments))
            .catch_unwind()
            .instrument(span.clone())
            .await
            .unwrap_or_else(|panic| Err(ChartError::InternalDispatchFault(panic_message(&*panic))));

        span.in_scope(|| {
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            match &result {
                Ok(_) => tracing::info!(duration_ms, "Tool call finished"),
                Err(e) if e.kind() == ErrorKind::InternalDispatchFault => {
                    tracing::error!(duration_ms, error = %e, "Tool call faulted")
                }
                Err(e) => tracing::warn!(duration_ms, error_kind = %e.kind(), "Tool call returned an error"),
            }
        });

        render(result)
    }

    fn list_resources(&self) -> Vec<Resource> {
        match Resource::new(CHART_TYPES_URI, Some("Available Chart Types".to_string())) {
            Ok(resource) => vec![
                resource
                    .with_description("Supported chart types with their remote ids and configuration schemas")
                    .with_mime_type("application/json"),
            ],
            Err(e) => {
                tracing::error!(error = %e, "Invalid resource URI");
                vec![]
            }
        }
    }

    async fn read_resource(&self, uri: &str) -> crate::server::error::Result<String> {
        if uri != CHART_TYPES_URI {
            return Err(crate::server::error::Error::ResourceNotFound(uri.to_string()));
        }
        Ok(pretty(&ChartTypeRegistry::global().catalog()))
    }
}

/// Converts a handler result into tool content; errors become text with `is_error` set.
fn render(result: OperationResult) -> CallToolResult {
    match result {
        Ok(Outcome::Image(image)) => {
            CallToolResult::success(vec![Content::image(BASE64.encode(&image.bytes), image.mime_type)])
        }
        Ok(outcome) => match outcome.to_json() {
            Some(payload) => CallToolResult::success(vec![Content::text(pretty(&payload))]),
            None => render(Err(ChartError::InternalDispatchFault(
                "result could not be serialized".to_string(),
            ))),
        },
        Err(e) => CallToolResult::error(vec![Content::text(pretty(&e.to_json()))]),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn tools() -> Vec<Tool> {
    let chart_types = ChartTypeRegistry::global().ids();
    let chart_id = |action: &str| {
        json!({
            "type": "string",
            "description": format!("ID of the chart to {action}"),
        })
    };

    vec![
        Tool::new(
            "create_chart",
            "Create a Datawrapper chart. chart_config must match the schema of the chosen \
             chart type (see get_chart_schema); title is always required. The chart is created \
             as an unpublished draft.\n\n\
             Example data: [{\"date\": \"2024-01\", \"value\": 100}, {\"date\": \"2024-02\", \"value\": 150}]",
            json!({
                "type": "object",
                "properties": {
                    "data": {"type": ["string", "array", "object"], "description": DATA_DESCRIPTION},
                    "chart_type": {
                        "type": "string",
                        "enum": chart_types,
                        "description": "Type of chart to create",
                    },
                    "chart_config": {
                        "type": "object",
                        "description": "Complete chart configuration using the fields of get_chart_schema",
                    },
                },
                "required": ["data", "chart_type", "chart_config"],
            }),
        ),
        Tool::new(
            "get_chart_schema",
            "Get the configuration schema of a chart type: every field with its type, \
             allowed values, default and description.",
            json!({
                "type": "object",
                "properties": {
                    "chart_type": {
                        "type": "string",
                        "enum": chart_types,
                        "description": "Chart type to describe",
                    },
                },
                "required": ["chart_type"],
            }),
        ),
        Tool::new(
            "publish_chart",
            "Publish a chart so it is publicly accessible and return its public URL. \
             Only call this when the user explicitly asks to publish.",
            json!({
                "type": "object",
                "properties": {"chart_id": chart_id("publish")},
                "required": ["chart_id"],
            }),
        ),
        Tool::new(
            "get_chart",
            "Get an existing chart: type, title, publication state, URLs and current configuration.",
            json!({
                "type": "object",
                "properties": {"chart_id": chart_id("retrieve")},
                "required": ["chart_id"],
            }),
        ),
        Tool::new(
            "update_chart",
            "Update an existing chart's data and/or configuration. chart_config uses the same \
             fields as get_chart_schema and is merged into the current configuration: only the \
             given fields change, color maps and legend settings merge key by key, and null \
             clears an optional field. Data, when given, replaces the chart's data.",
            json!({
                "type": "object",
                "properties": {
                    "chart_id": chart_id("update"),
                    "data": {"type": ["string", "array", "object"], "description": DATA_DESCRIPTION},
                    "chart_config": {
                        "type": "object",
                        "description": "Partial chart configuration using the fields of get_chart_schema",
                    },
                },
                "required": ["chart_id"],
            }),
        ),
        Tool::new(
            "delete_chart",
            "Delete a chart permanently.",
            json!({
                "type": "object",
                "properties": {"chart_id": chart_id("delete")},
                "required": ["chart_id"],
            }),
        ),
        Tool::new(
            "export_chart_png",
            "Export a chart as a PNG image, returned inline. \
             Only call this when the user explicitly asks for an image.",
            json!({
                "type": "object",
                "properties": {
                    "chart_id": chart_id("export"),
                    "width": {"type": "integer", "description": "Width of the chart in pixels"},
                    "height": {"type": "integer", "description": "Height of the chart in pixels"},
                    "plain": {
                        "type": "boolean",
                        "description": "Export only the visualization, without title and footer",
                        "default": false,
                    },
                    "zoom": {"type": "integer", "description": "Scale factor of the image", "default": 2},
                    "transparent": {
                        "type": "boolean",
                        "description": "Use a transparent background",
                        "default": false,
                    },
                    "border_width": {"type": "integer", "description": "Margin around the chart in pixels"},
                    "border_color": {"type": "string", "description": "Color of the margin, e.g. #ffffff"},
                    "format": {"type": "string", "enum": ["png"], "description": "Image format", "default": "png"},
                },
                "required": ["chart_id"],
            }),
        ),
    ]
}
