use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error member of a JSON-RPC error response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorData {
    /// One of the codes in `protocol::constants`.
    pub code: i32,

    /// A concise single-sentence description.
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorData {
    pub fn new<S: Into<String>>(code: i32, message: S) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
