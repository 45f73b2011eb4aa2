#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use datawrapper_mcp_charts::{
    client::{ChartClient, ChartState, ExportOptions, PublishedChart, RemoteChart},
    dataset::CanonicalDataset,
    error::RemoteFault,
};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

pub const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

#[derive(Debug, Clone)]
pub struct StoredChart {
    pub document: Value,
    pub data: Option<CanonicalDataset>,
    pub state: ChartState,
    pub version: u64,
}

/// In-memory chart service with soft deletes and a call counter.
#[derive(Default)]
pub struct FakeChartClient {
    charts: Mutex<HashMap<String, StoredChart>>,
    failure: Mutex<Option<RemoteFault>>,
    calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeChartClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn chart(&self, chart_id: &str) -> Option<StoredChart> {
        self.charts.lock().await.get(chart_id).cloned()
    }

    /// Seeds a chart as if it had been made in the web editor.
    pub async fn insert(&self, chart_id: &str, document: Value) {
        self.charts.lock().await.insert(
            chart_id.to_string(),
            StoredChart {
                document,
                data: None,
                state: ChartState::Draft,
                version: 0,
            },
        );
    }

    /// Makes the next remote call fail with `fault`.
    pub async fn fail_next(&self, fault: RemoteFault) {
        *self.failure.lock().await = Some(fault);
    }

    async fn begin(&self) -> Result<(), RemoteFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().await.take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn snapshot(chart_id: &str, stored: &StoredChart) -> RemoteChart {
        let public_url = (stored.version > 0)
            .then(|| format!("https://datawrapper.dwcdn.net/{chart_id}/{}/", stored.version));
        RemoteChart {
            id: chart_id.to_string(),
            remote_type: stored.document["type"].as_str().unwrap_or_default().to_string(),
            state: stored.state,
            public_url,
            document: stored.document.clone(),
        }
    }
}

/// RFC 7396 merge patch, the way the service applies a PATCH body.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn not_found(chart_id: &str) -> RemoteFault {
    RemoteFault::new(404, format!("chart {chart_id} not found"))
}

/// Looks up a chart that may still be modified.
fn live<'a>(
    charts: &'a mut HashMap<String, StoredChart>,
    chart_id: &str,
) -> Result<&'a mut StoredChart, RemoteFault> {
    match charts.get_mut(chart_id) {
        Some(stored) if stored.state != ChartState::Deleted => Ok(stored),
        _ => Err(not_found(chart_id)),
    }
}

#[async_trait]
impl ChartClient for FakeChartClient {
    async fn create_chart(&self, remote_type: &str, document: Value) -> Result<RemoteChart, RemoteFault> {
        self.begin().await?;
        let chart_id = format!("fake{:02}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut document = document;
        merge_patch(&mut document, &json!({"id": chart_id, "type": remote_type}));

        let stored = StoredChart {
            document,
            data: None,
            state: ChartState::Draft,
            version: 0,
        };
        let snapshot = Self::snapshot(&chart_id, &stored);
        self.charts.lock().await.insert(chart_id, stored);
        Ok(snapshot)
    }

    async fn upload_data(&self, chart_id: &str, dataset: &CanonicalDataset) -> Result<(), RemoteFault> {
        self.begin().await?;
        let mut charts = self.charts.lock().await;
        live(&mut charts, chart_id)?.data = Some(dataset.clone());
        Ok(())
    }

    async fn update_chart(&self, chart_id: &str, patch: Value) -> Result<(), RemoteFault> {
        self.begin().await?;
        let mut charts = self.charts.lock().await;
        merge_patch(&mut live(&mut charts, chart_id)?.document, &patch);
        Ok(())
    }

    async fn publish_chart(&self, chart_id: &str) -> Result<PublishedChart, RemoteFault> {
        self.begin().await?;
        let mut charts = self.charts.lock().await;
        let stored = live(&mut charts, chart_id)?;
        stored.version += 1;
        stored.state = ChartState::Published;
        Ok(PublishedChart {
            public_url: format!("https://datawrapper.dwcdn.net/{chart_id}/{}/", stored.version),
            version: Some(stored.version),
        })
    }

    async fn export_png(&self, chart_id: &str, options: &ExportOptions) -> Result<Vec<u8>, RemoteFault> {
        self.begin().await?;
        let mut charts = self.charts.lock().await;
        live(&mut charts, chart_id)?;
        let mut png = PNG_MAGIC.to_vec();
        png.extend(options.zoom.to_be_bytes());
        Ok(png)
    }

    async fn get_chart(&self, chart_id: &str) -> Result<RemoteChart, RemoteFault> {
        self.begin().await?;
        let charts = self.charts.lock().await;
        charts
            .get(chart_id)
            .map(|stored| Self::snapshot(chart_id, stored))
            .ok_or_else(|| not_found(chart_id))
    }

    async fn delete_chart(&self, chart_id: &str) -> Result<(), RemoteFault> {
        self.begin().await?;
        let mut charts = self.charts.lock().await;
        live(&mut charts, chart_id)?.state = ChartState::Deleted;
        Ok(())
    }
}
