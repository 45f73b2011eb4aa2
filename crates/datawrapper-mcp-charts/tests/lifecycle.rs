mod common;

use std::sync::Arc;

use common::{FakeChartClient, PNG_MAGIC};
use datawrapper_mcp_charts::{
    ChartOperations,
    args::{CreateArgs, ExportArgs, UpdateArgs},
    client::{ChartState, ExportOptions},
    error::{ChartError, ErrorKind, RemoteFault},
};
use serde_json::{Value, json};

fn setup() -> (Arc<FakeChartClient>, ChartOperations) {
    let client = Arc::new(FakeChartClient::new());
    let operations = ChartOperations::new(client.clone());
    (client, operations)
}

fn create_args(chart_type: &str, data: Value, chart_config: Value) -> CreateArgs {
    CreateArgs {
        chart_type: chart_type.to_string(),
        data,
        chart_config,
    }
}

fn update_args(chart_id: &str, data: Option<Value>, chart_config: Option<Value>) -> UpdateArgs {
    UpdateArgs {
        chart_id: chart_id.to_string(),
        data,
        chart_config,
    }
}

fn export_args(chart_id: &str, format: Option<&str>) -> ExportArgs {
    ExportArgs {
        chart_id: chart_id.to_string(),
        format: format.map(str::to_string),
        options: ExportOptions::default(),
    }
}

async fn create_trend(operations: &ChartOperations) -> String {
    operations
        .create_chart(create_args(
            "line",
            json!([{"year": 2020, "value": 100}, {"year": 2021, "value": 150}]),
            json!({"title": "Trend"}),
        ))
        .await
        .unwrap()
        .chart_id
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let (client, operations) = setup();

    let created = operations
        .create_chart(create_args(
            "line",
            json!([{"year": 2020, "value": 100}, {"year": 2021, "value": 150}]),
            json!({"title": "Trend"}),
        ))
        .await
        .unwrap();
    assert_eq!(created.chart_type, "line");
    assert_eq!(created.title, "Trend");
    assert_eq!(created.rows, 2);
    assert_eq!(created.columns, 2);
    let chart_id = created.chart_id;
    assert_eq!(
        created.edit_url,
        format!("https://app.datawrapper.de/chart/{chart_id}/visualize")
    );

    let stored = client.chart(&chart_id).await.unwrap();
    assert_eq!(stored.state, ChartState::Draft);
    assert_eq!(stored.document["type"], "d3-lines");
    assert_eq!(stored.document["title"], "Trend");

    let updated = operations
        .update_chart(update_args(
            &chart_id,
            Some(json!([
                {"year": 2020, "value": 100},
                {"year": 2021, "value": 150},
                {"year": 2022, "value": 200},
            ])),
            Some(json!({"intro": "Yearly values"})),
        ))
        .await
        .unwrap();
    assert_eq!(updated.rows, Some(3));
    assert_eq!(updated.updated_fields, vec!["intro"]);
    let stored = client.chart(&chart_id).await.unwrap();
    assert_eq!(stored.data.unwrap().row_count(), 3);
    assert_eq!(stored.document["title"], "Trend");
    assert_eq!(stored.document["metadata"]["describe"]["intro"], "Yearly values");

    let published = operations.publish_chart(&chart_id).await.unwrap();
    assert!(published.public_url.starts_with("https://"));
    let info = operations.get_chart(&chart_id).await.unwrap();
    assert_eq!(info.state, ChartState::Published);
    assert_eq!(info.public_url.as_deref(), Some(published.public_url.as_str()));

    let image = operations
        .export_chart_png(export_args(&chart_id, None))
        .await
        .unwrap();
    assert!(image.bytes.starts_with(PNG_MAGIC));
    assert_eq!(image.mime_type, "image/png");

    let deleted = operations.delete_chart(&chart_id).await.unwrap();
    assert_eq!(deleted.chart_id, chart_id);

    let err = operations.get_chart(&chart_id).await.unwrap_err();
    assert_eq!(err, ChartError::ChartNotFound { chart_id });
}

#[tokio::test]
async fn test_malformed_data_makes_no_remote_call() {
    let (client, operations) = setup();

    let err = operations
        .create_chart(create_args(
            "line",
            json!({"year": [2020, 2021], "value": [100]}),
            json!({"title": "Trend"}),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ColumnLengthMismatch);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_config_makes_no_remote_call() {
    let (client, operations) = setup();

    let err = operations
        .create_chart(create_args(
            "scatter",
            json!({"gdp": [1, 2], "life": [70, 80]}),
            json!({"title": "Spread", "x_column": "gdp"}),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingField);
    assert_eq!(err.path().as_deref(), Some("y_column"));

    let err = operations
        .create_chart(create_args("pie", json!([{"a": 1}]), json!({"title": "x"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownChartType);

    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_republish_is_idempotent() {
    let (client, operations) = setup();
    let chart_id = create_trend(&operations).await;

    let first = operations.publish_chart(&chart_id).await.unwrap();
    let second = operations.publish_chart(&chart_id).await.unwrap();
    assert_ne!(first.public_url, second.public_url);
    assert_eq!(client.chart(&chart_id).await.unwrap().state, ChartState::Published);
}

#[tokio::test]
async fn test_deleted_chart_rejects_every_operation() {
    let (client, operations) = setup();
    let chart_id = create_trend(&operations).await;
    operations.delete_chart(&chart_id).await.unwrap();
    let calls = client.call_count();

    let not_found = |err: ChartError| assert_eq!(err.kind(), ErrorKind::ChartNotFound);
    not_found(operations.delete_chart(&chart_id).await.unwrap_err());
    not_found(operations.publish_chart(&chart_id).await.unwrap_err());
    not_found(
        operations
            .export_chart_png(export_args(&chart_id, None))
            .await
            .unwrap_err(),
    );
    not_found(
        operations
            .update_chart(update_args(&chart_id, None, Some(json!({"intro": "x"}))))
            .await
            .unwrap_err(),
    );

    // each rejection stops after the read
    assert_eq!(client.call_count(), calls + 4);
}

#[tokio::test]
async fn test_unknown_chart_id() {
    let (_, operations) = setup();
    let err = operations.publish_chart("nope1").await.unwrap_err();
    assert_eq!(
        err,
        ChartError::ChartNotFound {
            chart_id: "nope1".into()
        }
    );
}

#[tokio::test]
async fn test_update_merges_configuration() {
    let (client, operations) = setup();
    let created = operations
        .create_chart(create_args(
            "line",
            json!({"year": [2020, 2021], "a": [1, 2], "b": [3, 4]}),
            json!({
                "title": "Trend",
                "intro": "Two series",
                "color_category": {"a": "#ff0000", "b": "#00ff00"},
            }),
        ))
        .await
        .unwrap();

    let updated = operations
        .update_chart(update_args(
            &created.chart_id,
            None,
            Some(json!({
                "color_category": {"b": "#0000ff"},
                "legend": {"position": "bottom"},
            })),
        ))
        .await
        .unwrap();
    assert_eq!(updated.updated_fields, vec!["color_category", "legend"]);
    assert_eq!(updated.rows, None);

    let document = client.chart(&created.chart_id).await.unwrap().document;
    let visualize = &document["metadata"]["visualize"];
    assert_eq!(
        visualize["color-category"]["map"],
        json!({"a": "#ff0000", "b": "#0000ff"})
    );
    assert_eq!(visualize["legend"]["position"], "bottom");
    assert_eq!(document["metadata"]["describe"]["intro"], "Two series");
    assert_eq!(document["title"], "Trend");

    let info = operations.get_chart(&created.chart_id).await.unwrap();
    assert_eq!(info.config["intro"], "Two series");
    assert_eq!(info.config["color_category"]["b"], "#0000ff");
}

#[tokio::test]
async fn test_update_null_clears_optional_field() {
    let (client, operations) = setup();
    let created = operations
        .create_chart(create_args(
            "bar",
            json!([{"name": "a", "value": 1}]),
            json!({"title": "Budget", "byline": "Desk"}),
        ))
        .await
        .unwrap();

    operations
        .update_chart(update_args(&created.chart_id, None, Some(json!({"byline": null}))))
        .await
        .unwrap();

    let document = client.chart(&created.chart_id).await.unwrap().document;
    assert!(document["metadata"]["describe"].get("byline").is_none());
}

#[tokio::test]
async fn test_unchanged_update_sends_no_patch() {
    let (client, operations) = setup();
    let chart_id = create_trend(&operations).await;
    let calls = client.call_count();

    let updated = operations
        .update_chart(update_args(&chart_id, None, Some(json!({"title": "Trend"}))))
        .await
        .unwrap();
    assert!(updated.updated_fields.is_empty());
    assert_eq!(client.call_count(), calls + 1);
}

#[tokio::test]
async fn test_update_cannot_change_chart_type() {
    let (client, operations) = setup();
    let chart_id = create_trend(&operations).await;
    let calls = client.call_count();

    let err = operations
        .update_chart(update_args(&chart_id, None, Some(json!({"chart_type": "bar"}))))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownField);
    assert_eq!(client.call_count(), calls + 1);
    assert_eq!(client.chart(&chart_id).await.unwrap().document["type"], "d3-lines");
}

#[tokio::test]
async fn test_update_validates_data_before_reading_the_chart() {
    let (client, operations) = setup();
    let chart_id = create_trend(&operations).await;
    let calls = client.call_count();

    let err = operations
        .update_chart(update_args(&chart_id, Some(json!("sales.csv")), None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedDataFormat);
    assert_eq!(client.call_count(), calls);
}

#[tokio::test]
async fn test_update_needs_something_to_change() {
    let (client, operations) = setup();
    let err = operations
        .update_chart(update_args("fake00", None, None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_update_of_chart_made_elsewhere() {
    let (client, operations) = setup();
    client
        .insert(
            "web01",
            json!({
                "id": "web01",
                "type": "d3-bars",
                "title": "Budget",
                "metadata": {"visualize": {"show-values": false, "custom-range": ["", ""]}},
            }),
        )
        .await;

    let updated = operations
        .update_chart(update_args("web01", None, Some(json!({"sort_bars": true}))))
        .await
        .unwrap();
    assert_eq!(updated.updated_fields, vec!["sort_bars"]);

    let document = client.chart("web01").await.unwrap().document;
    assert_eq!(document["metadata"]["visualize"]["sort-bars"], true);
    assert_eq!(document["metadata"]["visualize"]["show-values"], false);
    assert_eq!(document["metadata"]["visualize"]["custom-range"], json!(["", ""]));
}

#[tokio::test]
async fn test_unsupported_remote_type() {
    let (client, operations) = setup();
    client
        .insert("map01", json!({"id": "map01", "type": "d3-maps-choropleth", "title": "Map"}))
        .await;

    let info = operations.get_chart("map01").await.unwrap();
    assert_eq!(info.chart_type, "d3-maps-choropleth");
    assert_eq!(info.config, Value::Null);

    let err = operations
        .update_chart(update_args("map01", None, Some(json!({"intro": "x"}))))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownChartType);
}

#[tokio::test]
async fn test_remote_fault_is_surfaced_verbatim() {
    let (client, operations) = setup();
    let chart_id = create_trend(&operations).await;

    client.fail_next(RemoteFault::new(429, "Too many requests")).await;
    let err = operations.publish_chart(&chart_id).await.unwrap_err();
    assert_eq!(
        err,
        ChartError::RemoteServiceFault {
            status: Some(429),
            message: "Too many requests".into()
        }
    );

    client.fail_next(RemoteFault::transport("request timed out")).await;
    let err = operations.get_chart(&chart_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteServiceFault);
    assert_eq!(err.to_json()["error"].get("status"), None);
}

#[tokio::test]
async fn test_export_rejects_other_formats() {
    let (client, operations) = setup();
    let chart_id = create_trend(&operations).await;
    let calls = client.call_count();

    let err = operations
        .export_chart_png(export_args(&chart_id, Some("svg")))
        .await
        .unwrap_err();
    assert_eq!(err, ChartError::UnsupportedExportFormat("svg".into()));
    assert_eq!(client.call_count(), calls);

    assert!(
        operations
            .export_chart_png(export_args(&chart_id, Some("PNG")))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_concurrent_creates_are_independent() {
    let (client, operations) = setup();

    let creates = (0..5).map(|i| {
        operations.create_chart(create_args(
            "column",
            json!([{"label": "a", "value": i}]),
            json!({"title": format!("Chart {i}")}),
        ))
    });
    let results = futures::future::join_all(creates).await;

    let mut ids: Vec<String> = results.into_iter().map(|r| r.unwrap().chart_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
    assert_eq!(client.call_count(), 10);
}

#[tokio::test]
async fn test_schema_discovery_is_local() {
    let (client, operations) = setup();
    let schema = operations.chart_schema("arrow").unwrap();
    assert_eq!(schema.remote_type, "d3-arrow-plot");
    assert_eq!(schema.schema["required"], json!(["title", "start_column", "end_column"]));

    let err = operations.chart_schema("pie").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownChartType);
    assert_eq!(client.call_count(), 0);
}
