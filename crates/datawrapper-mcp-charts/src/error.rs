use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Stable names of every failure a chart operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnknownChartType,
    UnknownField,
    MissingField,
    TypeMismatch,
    InvalidEnumValue,
    OutOfRange,
    MalformedDataEncoding,
    IncompleteRecord,
    ColumnLengthMismatch,
    EmptyDataset,
    UnsupportedDataFormat,
    ChartNotFound,
    RemoteServiceFault,
    UnsupportedExportFormat,
    InvalidArguments,
    InternalDispatchFault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownChartType => "UnknownChartType",
            ErrorKind::UnknownField => "UnknownField",
            ErrorKind::MissingField => "MissingField",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::InvalidEnumValue => "InvalidEnumValue",
            ErrorKind::OutOfRange => "OutOfRange",
            ErrorKind::MalformedDataEncoding => "MalformedDataEncoding",
            ErrorKind::IncompleteRecord => "IncompleteRecord",
            ErrorKind::ColumnLengthMismatch => "ColumnLengthMismatch",
            ErrorKind::EmptyDataset => "EmptyDataset",
            ErrorKind::UnsupportedDataFormat => "UnsupportedDataFormat",
            ErrorKind::ChartNotFound => "ChartNotFound",
            ErrorKind::RemoteServiceFault => "RemoteServiceFault",
            ErrorKind::UnsupportedExportFormat => "UnsupportedExportFormat",
            ErrorKind::InvalidArguments => "InvalidArguments",
            ErrorKind::InternalDispatchFault => "InternalDispatchFault",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem found while validating a configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub kind: ErrorKind,
    /// Dotted path into the configuration, e.g. `legend.position` or `custom_range[1]`.
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn unknown(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: ErrorKind::UnknownField,
            message: format!("'{path}' is not a field of this chart type"),
            path,
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: ErrorKind::MissingField,
            message: format!("'{path}' is required"),
            path,
        }
    }

    pub fn type_mismatch(path: impl Into<String>, expected: &str, actual: &str) -> Self {
        let path = path.into();
        Self {
            kind: ErrorKind::TypeMismatch,
            message: format!("'{path}' must be {expected}, got {actual}"),
            path,
        }
    }

    pub fn invalid_enum(path: impl Into<String>, value: &str, allowed: &[&str]) -> Self {
        let path = path.into();
        Self {
            kind: ErrorKind::InvalidEnumValue,
            message: format!(
                "'{value}' is not a valid value for '{path}'; expected one of: {}",
                allowed.join(", ")
            ),
            path,
        }
    }

    pub fn out_of_range(path: impl Into<String>, detail: impl fmt::Display) -> Self {
        let path = path.into();
        Self {
            kind: ErrorKind::OutOfRange,
            message: format!("'{path}' {detail}"),
            path,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Every field-level problem of one configuration, in schema order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Failure reported by the remote chart service, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} {message}", status_label(.status))]
pub struct RemoteFault {
    /// HTTP status, absent for transport failures and timeouts.
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteFault {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Maps the fault onto the local taxonomy. Only a 404 on a known chart id
    /// counts as `ChartNotFound`.
    pub fn into_chart_error(self, chart_id: Option<&str>) -> ChartError {
        match (self.status, chart_id) {
            (Some(404), Some(id)) => ChartError::ChartNotFound {
                chart_id: id.to_string(),
            },
            _ => ChartError::RemoteServiceFault {
                status: self.status,
                message: self.message,
            },
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("[HTTP {code}]"),
        None => "[no response]".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("Unknown chart type '{requested}'; supported types: {supported}")]
    UnknownChartType { requested: String, supported: String },

    #[error("Invalid chart configuration: {0}. Use get_chart_schema to see the valid fields")]
    Validation(ValidationErrors),

    #[error("Malformed data encoding: {0}")]
    MalformedDataEncoding(String),

    #[error("Record {row} is missing column '{column}'; every record must have the same columns")]
    IncompleteRecord { row: usize, column: String },

    #[error("Column '{column}' has {actual} values but {expected} were expected")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Unsupported data format: {0}")]
    UnsupportedDataFormat(String),

    #[error("Chart '{chart_id}' not found")]
    ChartNotFound { chart_id: String },

    #[error("Remote service fault {}: {message}", status_label(.status))]
    RemoteServiceFault { status: Option<u16>, message: String },

    #[error("Unsupported export format '{0}'; only 'png' is supported")]
    UnsupportedExportFormat(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Internal dispatch fault: {0}")]
    InternalDispatchFault(String),
}

impl ChartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChartError::UnknownChartType { .. } => ErrorKind::UnknownChartType,
            ChartError::Validation(errors) => errors
                .first()
                .map(|e| e.kind)
                .unwrap_or(ErrorKind::TypeMismatch),
            ChartError::MalformedDataEncoding(_) => ErrorKind::MalformedDataEncoding,
            ChartError::IncompleteRecord { .. } => ErrorKind::IncompleteRecord,
            ChartError::ColumnLengthMismatch { .. } => ErrorKind::ColumnLengthMismatch,
            ChartError::EmptyDataset(_) => ErrorKind::EmptyDataset,
            ChartError::UnsupportedDataFormat(_) => ErrorKind::UnsupportedDataFormat,
            ChartError::ChartNotFound { .. } => ErrorKind::ChartNotFound,
            ChartError::RemoteServiceFault { .. } => ErrorKind::RemoteServiceFault,
            ChartError::UnsupportedExportFormat(_) => ErrorKind::UnsupportedExportFormat,
            ChartError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            ChartError::InternalDispatchFault(_) => ErrorKind::InternalDispatchFault,
        }
    }

    /// Location of the fault inside the caller's input, when there is one.
    pub fn path(&self) -> Option<String> {
        match self {
            ChartError::Validation(errors) => errors.first().map(|e| e.path.clone()),
            ChartError::IncompleteRecord { row, column } => Some(format!("data[{row}].{column}")),
            ChartError::ColumnLengthMismatch { column, .. } => Some(format!("data.{column}")),
            _ => None,
        }
    }

    pub fn unknown_chart_type(requested: &str, supported: &[&str]) -> Self {
        ChartError::UnknownChartType {
            requested: requested.to_string(),
            supported: supported.join(", "),
        }
    }

    /// Structured rendering handed back to the caller.
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "kind": self.kind().as_str(),
            "message": self.to_string(),
        });
        if let Some(path) = self.path() {
            error["path"] = json!(path);
        }
        match self {
            ChartError::Validation(errors) => error["fields"] = json!(errors),
            ChartError::RemoteServiceFault {
                status: Some(status),
                ..
            } => error["status"] = json!(status),
            _ => {}
        }
        json!({ "error": error })
    }
}

impl From<ValidationErrors> for ChartError {
    fn from(errors: ValidationErrors) -> Self {
        ChartError::Validation(errors)
    }
}
