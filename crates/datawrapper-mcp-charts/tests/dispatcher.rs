mod common;

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use common::{FakeChartClient, PNG_MAGIC};
use datawrapper_mcp_charts::{
    ChartRouter,
    client::{ChartClient, ExportOptions, PublishedChart, RemoteChart},
    core::{
        CallToolResult,
        protocol::message::{JsonRpcRequest, RequestId},
    },
    dataset::CanonicalDataset,
    error::RemoteFault,
    router::CHART_TYPES_URI,
    server::{Router, Server},
};
use serde_json::{Value, json};

fn router() -> (Arc<FakeChartClient>, ChartRouter) {
    let client = Arc::new(FakeChartClient::new());
    (client.clone(), ChartRouter::new(client))
}

fn payload(result: &CallToolResult) -> Value {
    let text = result.content[0].as_text().expect("text content");
    serde_json::from_str(text).expect("json payload")
}

async fn create(router: &ChartRouter) -> String {
    let result = router
        .call_tool(
            "create_chart",
            json!({
                "chart_type": "bar",
                "data": "[{\"country\": \"NO\", \"share\": 12.5}, {\"country\": \"SE\", \"share\": 9.1}]",
                "chart_config": {"title": "Shares", "sort_bars": true},
            }),
        )
        .await;
    assert!(!result.is_error());
    payload(&result)["chart_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_returns_chart_summary() {
    let (client, router) = router();
    let result = router
        .call_tool(
            "create_chart",
            json!({
                "chart_type": "bar",
                "data": [{"country": "NO", "share": 12.5}],
                "chart_config": "{\"title\": \"Shares\"}",
            }),
        )
        .await;

    assert!(!result.is_error());
    let body = payload(&result);
    let chart_id = body["chart_id"].as_str().unwrap();
    assert_eq!(body["chart_type"], "bar");
    assert_eq!(body["rows"], 1);
    assert_eq!(body["message"], "Chart created successfully!");

    let stored = client.chart(chart_id).await.unwrap();
    assert_eq!(stored.document["metadata"]["visualize"]["show-values"], true);
}

#[tokio::test]
async fn test_errors_are_tool_results() {
    let (client, router) = router();

    let result = router.call_tool("draw_chart", json!({})).await;
    assert!(result.is_error());
    assert_eq!(payload(&result)["error"]["kind"], "InvalidArguments");

    let result = router
        .call_tool(
            "create_chart",
            json!({
                "chart_type": "line",
                "data": [{"x": 1}],
                "chart_config": {"title": "T", "label_margin": 900},
            }),
        )
        .await;
    assert!(result.is_error());
    let body = payload(&result);
    let error = &body["error"];
    assert_eq!(error["kind"], "OutOfRange");
    assert_eq!(error["path"], "label_margin");

    let result = router.call_tool("get_chart", json!({"chart_id": "gone1"})).await;
    assert_eq!(payload(&result)["error"]["kind"], "ChartNotFound");

    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_export_returns_inline_image() {
    let (_, router) = router();
    let chart_id = create(&router).await;

    let result = router
        .call_tool("export_chart_png", json!({"chart_id": chart_id, "zoom": "3"}))
        .await;

    assert!(!result.is_error());
    let (data, mime_type) = result.content[0].as_image().expect("image content");
    assert_eq!(mime_type, "image/png");
    let bytes = BASE64.decode(data).unwrap();
    assert!(bytes.starts_with(PNG_MAGIC));
    assert_eq!(bytes[PNG_MAGIC.len()..], 3_u32.to_be_bytes());
}

#[tokio::test]
async fn test_schema_tool_is_local() {
    let (client, router) = router();
    let result = router
        .call_tool("get_chart_schema", json!({"chart_type": "stacked_bar"}))
        .await;

    let body = payload(&result);
    assert_eq!(body["remote_type"], "d3-bars-stacked");
    assert_eq!(body["schema"]["properties"]["stack_percentages"]["type"], "boolean");
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_update_and_get_through_tools() {
    let (_, router) = router();
    let chart_id = create(&router).await;

    let result = router
        .call_tool(
            "update_chart",
            json!({"chart_id": chart_id, "chart_config": {"intro": "Share of total"}}),
        )
        .await;
    assert_eq!(payload(&result)["updated_fields"], json!(["intro"]));

    let result = router.call_tool("get_chart", json!({"chart_id": chart_id})).await;
    let body = payload(&result);
    assert_eq!(body["state"], "draft");
    assert_eq!(body["config"]["intro"], "Share of total");
    assert_eq!(body["config"]["sort_bars"], true);
}

struct PanickingClient;

#[async_trait]
impl ChartClient for PanickingClient {
    async fn create_chart(&self, _: &str, _: Value) -> Result<RemoteChart, RemoteFault> {
        panic!("create exploded")
    }

    async fn upload_data(&self, _: &str, _: &CanonicalDataset) -> Result<(), RemoteFault> {
        Ok(())
    }

    async fn update_chart(&self, _: &str, _: Value) -> Result<(), RemoteFault> {
        Ok(())
    }

    async fn publish_chart(&self, _: &str) -> Result<PublishedChart, RemoteFault> {
        Err(RemoteFault::transport("unused"))
    }

    async fn export_png(&self, _: &str, _: &ExportOptions) -> Result<Vec<u8>, RemoteFault> {
        Err(RemoteFault::transport("unused"))
    }

    async fn get_chart(&self, _: &str) -> Result<RemoteChart, RemoteFault> {
        panic!("{}", String::from("get exploded"))
    }

    async fn delete_chart(&self, _: &str) -> Result<(), RemoteFault> {
        Ok(())
    }
}

#[tokio::test]
async fn test_panicking_handler_becomes_internal_fault() {
    let router = ChartRouter::new(Arc::new(PanickingClient));

    let result = router
        .call_tool(
            "create_chart",
            json!({"chart_type": "column", "data": [{"a": 1}], "chart_config": {"title": "T"}}),
        )
        .await;
    assert!(result.is_error());
    let body = payload(&result);
    let error = &body["error"];
    assert_eq!(error["kind"], "InternalDispatchFault");
    assert!(error["message"].as_str().unwrap().contains("create exploded"));

    // the router keeps serving after a fault
    let result = router.call_tool("get_chart", json!({"chart_id": "x1"})).await;
    assert!(payload(&result)["error"]["message"].as_str().unwrap().contains("get exploded"));
}

fn request(method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(Some(RequestId::Number(7)), method, Some(params))
}

#[tokio::test]
async fn test_server_round_trip() {
    let (_, router) = router();

    let response = Server::process_request(&router, request("tools/list", json!({}))).await;
    let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
    assert_eq!(tools, 7);

    let response = Server::process_request(
        &router,
        request(
            "tools/call",
            json!({"name": "publish_chart", "arguments": {"chart_id": "nope1"}}),
        ),
    )
    .await;
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);

    let response = Server::process_request(&router, request("resources/list", json!({}))).await;
    let resources = response.result.unwrap();
    assert_eq!(resources["resources"][0]["uri"], CHART_TYPES_URI);
    assert_eq!(resources["resources"][0]["name"], "Available Chart Types");

    let response =
        Server::process_request(&router, request("resources/read", json!({"uri": CHART_TYPES_URI})))
            .await;
    let result = response.result.unwrap();
    let contents = &result["contents"][0];
    assert_eq!(contents["mimeType"], "application/json");
    let catalog: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
    assert_eq!(catalog["chart_types"].as_array().unwrap().len(), 8);

    let response = Server::process_request(
        &router,
        request("resources/read", json!({"uri": "datawrapper://charts"})),
    )
    .await;
    assert!(response.error.is_some());
}
