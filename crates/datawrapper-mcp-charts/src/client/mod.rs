//! Boundary to the remote chart-hosting service.
//!
//! Implementations speak in remote document shapes and report failures as
//! [`RemoteFault`]s; interpreting a fault is left to the handlers.

pub mod datawrapper;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{dataset::CanonicalDataset, error::RemoteFault};

pub use datawrapper::{ClientConfig, DatawrapperClient};

pub const DEFAULT_EDIT_URL: &str = "https://app.datawrapper.de/chart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartState {
    Draft,
    Published,
    Deleted,
}

impl ChartState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartState::Draft => "draft",
            ChartState::Published => "published",
            ChartState::Deleted => "deleted",
        }
    }
}

/// A chart as observed on the remote service during one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChart {
    pub id: String,
    pub remote_type: String,
    pub state: ChartState,
    pub public_url: Option<String>,
    /// Raw chart document; `title` and `metadata` feed configuration decoding.
    pub document: Value,
}

impl RemoteChart {
    pub fn title(&self) -> Option<&str> {
        self.document.get("title").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedChart {
    pub public_url: String,
    pub version: Option<u64>,
}

/// Rendering options of a PNG export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub plain: bool,
    pub zoom: u32,
    pub transparent: bool,
    pub border_width: Option<u32>,
    pub border_color: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            plain: false,
            zoom: 2,
            transparent: false,
            border_width: None,
            border_color: None,
        }
    }
}

impl ExportOptions {
    /// Query parameters in the remote service's naming.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(width) = self.width {
            query.push(("width", width.to_string()));
        }
        if let Some(height) = self.height {
            query.push(("height", height.to_string()));
        }
        query.push(("plain", self.plain.to_string()));
        query.push(("zoom", self.zoom.to_string()));
        query.push(("transparent", self.transparent.to_string()));
        if let Some(border_width) = self.border_width {
            query.push(("borderWidth", border_width.to_string()));
        }
        if let Some(border_color) = &self.border_color {
            query.push(("borderColor", border_color.clone()));
        }
        query
    }
}

#[async_trait]
pub trait ChartClient: Send + Sync {
    /// Creates an empty chart of `remote_type` from a `{title, metadata}` document.
    async fn create_chart(&self, remote_type: &str, document: Value) -> Result<RemoteChart, RemoteFault>;

    /// Replaces the chart's data with `dataset`.
    async fn upload_data(&self, chart_id: &str, dataset: &CanonicalDataset) -> Result<(), RemoteFault>;

    /// Deep-merges `patch` into the chart document; `null` entries remove keys.
    async fn update_chart(&self, chart_id: &str, patch: Value) -> Result<(), RemoteFault>;

    async fn publish_chart(&self, chart_id: &str) -> Result<PublishedChart, RemoteFault>;

    async fn export_png(&self, chart_id: &str, options: &ExportOptions) -> Result<Vec<u8>, RemoteFault>;

    async fn get_chart(&self, chart_id: &str) -> Result<RemoteChart, RemoteFault>;

    async fn delete_chart(&self, chart_id: &str) -> Result<(), RemoteFault>;

    fn edit_url(&self, chart_id: &str) -> String {
        format!("{DEFAULT_EDIT_URL}/{chart_id}/visualize")
    }
}
