use serde::Serialize;
use serde_json::Value;

use crate::{client::ChartState, error::ChartError};

pub const PNG_MIME_TYPE: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartCreated {
    pub chart_id: String,
    pub chart_type: String,
    pub title: String,
    pub edit_url: String,
    pub rows: usize,
    pub columns: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartUpdated {
    pub chart_id: String,
    pub edit_url: String,
    pub updated_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPublished {
    pub chart_id: String,
    pub public_url: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartInfo {
    pub chart_id: String,
    /// Local chart type id, or the remote visualization id when it is not one we support.
    pub chart_type: String,
    pub title: Option<String>,
    pub state: ChartState,
    pub public_url: Option<String>,
    pub edit_url: String,
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDeleted {
    pub chart_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSchema {
    pub chart_type: String,
    pub remote_type: String,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    pub chart_id: String,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Successful result of any chart operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(ChartCreated),
    Updated(ChartUpdated),
    Published(ChartPublished),
    Info(ChartInfo),
    Deleted(ChartDeleted),
    Schema(ChartSchema),
    Image(ExportedImage),
}

pub type OperationResult = Result<Outcome, ChartError>;

macro_rules! impl_from_outcome {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Outcome {
                fn from(value: $ty) -> Self {
                    Outcome::$variant(value)
                }
            }
        )*
    };
}

impl_from_outcome!(
    Created(ChartCreated),
    Updated(ChartUpdated),
    Published(ChartPublished),
    Info(ChartInfo),
    Deleted(ChartDeleted),
    Schema(ChartSchema),
    Image(ExportedImage),
);

impl Outcome {
    /// Textual payload; `None` for binary outcomes.
    pub fn to_json(&self) -> Option<Value> {
        let value = match self {
            Outcome::Created(v) => serde_json::to_value(v),
            Outcome::Updated(v) => serde_json::to_value(v),
            Outcome::Published(v) => serde_json::to_value(v),
            Outcome::Info(v) => serde_json::to_value(v),
            Outcome::Deleted(v) => serde_json::to_value(v),
            Outcome::Schema(v) => serde_json::to_value(v),
            Outcome::Image(_) => return None,
        };
        value.ok()
    }
}
