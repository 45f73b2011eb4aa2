use datawrapper_mcp_error::{Error, Result};

use crate::protocol::{
    constants::{JSONRPC_EXPECTED_VERSION, JSONRPC_VERSION_FIELD},
    message::JsonRpcMessage,
};

/// Parses a JSON-RPC message from a string, validating structure and version.
pub fn parse_json_rpc_message(line: &str) -> Result<JsonRpcMessage> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    let Some(obj) = value.as_object() else {
        return Err(Error::InvalidMessage(
            "Message must be a JSON object".into(),
        ));
    };

    match obj.get(JSONRPC_VERSION_FIELD) {
        Some(serde_json::Value::String(v)) if v == JSONRPC_EXPECTED_VERSION => {}
        _ => {
            return Err(Error::InvalidMessage(
                "Missing or invalid jsonrpc version".into(),
            ));
        }
    }

    let msg = serde_json::from_value(value)?;
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_object() {
        let err = parse_json_rpc_message("[1, 2]").unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let err = parse_json_rpc_message(r#"{"jsonrpc": "1.0", "id": 1, "method": "ping"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn test_parses_request() {
        let msg = parse_json_rpc_message(r#"{"jsonrpc": "2.0", "id": 7, "method": "tools/list"}"#)
            .unwrap();
        assert!(matches!(msg, JsonRpcMessage::Request(_)));
    }
}
