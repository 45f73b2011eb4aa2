//! Loose argument coercion for tool calls.
//!
//! Callers are language models and send whatever looks right: numbers as
//! strings, booleans as `"true"`, configurations as JSON text. Anything that
//! cannot be read unambiguously is an `InvalidArguments` error.

use serde_json::{Map, Value};

use crate::{client::ExportOptions, error::ChartError};

#[derive(Debug, Clone, PartialEq)]
pub struct CreateArgs {
    pub chart_type: String,
    pub data: Value,
    pub chart_config: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateArgs {
    pub chart_id: String,
    pub data: Option<Value>,
    pub chart_config: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportArgs {
    pub chart_id: String,
    pub format: Option<String>,
    pub options: ExportOptions,
}

impl CreateArgs {
    pub fn parse(arguments: Value) -> Result<Self, ChartError> {
        let args = Args::new("create_chart", arguments)?;
        Ok(Self {
            chart_type: args.required_string("chart_type")?,
            data: args
                .optional("data")
                .cloned()
                .ok_or_else(|| args.missing("data"))?,
            chart_config: args.config("chart_config")?.unwrap_or(Value::Null),
        })
    }
}

impl UpdateArgs {
    pub fn parse(arguments: Value) -> Result<Self, ChartError> {
        let args = Args::new("update_chart", arguments)?;
        Ok(Self {
            chart_id: args.required_string("chart_id")?,
            data: args.optional("data").cloned(),
            chart_config: args.config("chart_config")?,
        })
    }
}

impl ExportArgs {
    pub fn parse(arguments: Value) -> Result<Self, ChartError> {
        let args = Args::new("export_chart_png", arguments)?;
        let defaults = ExportOptions::default();
        Ok(Self {
            chart_id: args.required_string("chart_id")?,
            format: args.optional_string("format")?,
            options: ExportOptions {
                width: args.optional_u32("width")?,
                height: args.optional_u32("height")?,
                plain: args.flag("plain", defaults.plain)?,
                zoom: args.optional_u32("zoom")?.unwrap_or(defaults.zoom),
                transparent: args.flag("transparent", defaults.transparent)?,
                border_width: args.optional_u32("border_width")?,
                border_color: args.optional_string("border_color")?,
            },
        })
    }
}

/// `chart_id` of publish/get/delete calls.
pub fn chart_id(tool: &str, arguments: Value) -> Result<String, ChartError> {
    Args::new(tool, arguments)?.required_string("chart_id")
}

/// `chart_type` of schema discovery calls.
pub fn chart_type(tool: &str, arguments: Value) -> Result<String, ChartError> {
    Args::new(tool, arguments)?.required_string("chart_type")
}

struct Args<'a> {
    tool: &'a str,
    map: Map<String, Value>,
}

impl<'a> Args<'a> {
    fn new(tool: &'a str, arguments: Value) -> Result<Self, ChartError> {
        let map = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            Value::String(text) => match serde_json::from_str(&text) {
                Ok(Value::Object(map)) => map,
                _ => return Err(invalid(format!("{tool} arguments must be an object"))),
            },
            _ => return Err(invalid(format!("{tool} arguments must be an object"))),
        };
        Ok(Self { tool, map })
    }

    fn missing(&self, key: &str) -> ChartError {
        invalid(format!("{} requires '{key}'", self.tool))
    }

    fn optional(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn required_string(&self, key: &str) -> Result<String, ChartError> {
        self.optional_string(key)?
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| self.missing(key))
    }

    fn optional_string(&self, key: &str) -> Result<Option<String>, ChartError> {
        match self.optional(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(invalid(format!("'{key}' must be a string"))),
        }
    }

    fn optional_u32(&self, key: &str) -> Result<Option<u32>, ChartError> {
        let Some(value) = self.optional(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(format!("'{key}' must be a non-negative integer, got {value}")))
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ChartError> {
        match self.optional(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(invalid(format!("'{key}' must be a boolean, got \"{s}\""))),
            },
            Some(Value::Number(n)) if n.as_u64() == Some(0) => Ok(false),
            Some(Value::Number(n)) if n.as_u64() == Some(1) => Ok(true),
            Some(other) => Err(invalid(format!("'{key}' must be a boolean, got {other}"))),
        }
    }

    /// A configuration object, also accepted as JSON text.
    fn config(&self, key: &str) -> Result<Option<Value>, ChartError> {
        match self.optional(key) {
            None => Ok(None),
            Some(Value::String(text)) => serde_json::from_str(text)
                .map(Some)
                .map_err(|e| invalid(format!("'{key}' is not valid JSON: {e}"))),
            Some(value) => Ok(Some(value.clone())),
        }
    }
}

fn invalid(message: String) -> ChartError {
    ChartError::InvalidArguments(message)
}
