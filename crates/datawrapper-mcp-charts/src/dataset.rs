//! Normalization of caller supplied tabular data.
//!
//! Three shapes are accepted: a list of records, a mapping of column name to
//! values, or a JSON string holding either. Everything else (file paths, raw
//! CSV text, nested cells) is refused so the accepted surface stays small.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::{error::ChartError, registry::json_type_name};

const DATA_HINT: &str = "pass a list of records like [{\"year\": 2020, \"value\": 100}] \
                         or columns like {\"year\": [2020, 2021], \"value\": [100, 150]}";

/// A single cell. Values keep the JSON type they arrived with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }

    fn csv_field(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

/// Ordered columns of equal length, with at least one column and one row.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDataset {
    columns: Vec<Column>,
}

impl CanonicalDataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, ChartError> {
        let Some(first) = columns.first() else {
            return Err(ChartError::EmptyDataset(
                "no columns were supplied".to_string(),
            ));
        };
        let expected = first.values.len();
        if let Some(column) = columns.iter().find(|c| c.values.len() != expected) {
            return Err(ChartError::ColumnLengthMismatch {
                column: column.name.clone(),
                expected,
                actual: column.values.len(),
            });
        }
        if expected == 0 {
            return Err(ChartError::EmptyDataset("no rows were supplied".to_string()));
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn to_columnar_json(&self) -> Value {
        let columns: Map<String, Value> = self
            .columns
            .iter()
            .map(|c| {
                let values = c.values.iter().map(Scalar::to_value).collect();
                (c.name.clone(), Value::Array(values))
            })
            .collect();
        Value::Object(columns)
    }

    pub fn to_records_json(&self) -> Value {
        let records = (0..self.row_count())
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[row].to_value()))
                    .collect();
                Value::Object(record)
            })
            .collect();
        Value::Array(records)
    }

    /// Comma separated rendering with a header row, as uploaded to the remote service.
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.row_count() {
            writer.write_record(self.columns.iter().map(|c| c.values[row].csv_field()))?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Converts any accepted data shape into a [`CanonicalDataset`].
pub fn normalize(input: &Value) -> Result<CanonicalDataset, ChartError> {
    match input {
        Value::Array(records) => from_records(records),
        Value::Object(columns) => from_columns(columns),
        Value::String(text) => from_text(text),
        other => Err(ChartError::UnsupportedDataFormat(format!(
            "got {}; {DATA_HINT}",
            json_type_name(other)
        ))),
    }
}

fn from_text(text: &str) -> Result<CanonicalDataset, ChartError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChartError::EmptyDataset("the data string is empty".to_string()));
    }
    let json_like = trimmed.starts_with('[') || trimmed.starts_with('{');

    if !json_like && looks_like_file_path(trimmed) {
        return Err(ChartError::UnsupportedDataFormat(format!(
            "file paths are not supported; read the file first and {DATA_HINT}"
        )));
    }
    if !json_like && trimmed.contains('\n') && trimmed.contains(',') {
        return Err(ChartError::UnsupportedDataFormat(format!(
            "CSV text is not supported; parse it first and {DATA_HINT}"
        )));
    }

    let parsed: Value = serde_json::from_str(trimmed)
        .map_err(|e| ChartError::MalformedDataEncoding(format!("invalid JSON ({e}); {DATA_HINT}")))?;
    match parsed {
        Value::Array(records) => from_records(&records),
        Value::Object(columns) => from_columns(&columns),
        other => Err(ChartError::UnsupportedDataFormat(format!(
            "the data string decodes to {}; {DATA_HINT}",
            json_type_name(&other)
        ))),
    }
}

fn looks_like_file_path(text: &str) -> bool {
    [".csv", ".json", ".txt"].iter().any(|ext| text.ends_with(ext))
        || text.contains('/')
        || text.contains('\\')
}

fn from_records(records: &[Value]) -> Result<CanonicalDataset, ChartError> {
    if records.is_empty() {
        return Err(ChartError::EmptyDataset(
            "the record list has no rows".to_string(),
        ));
    }

    let mut rows = Vec::with_capacity(records.len());
    let mut names: Vec<&str> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(ChartError::UnsupportedDataFormat(format!(
                "record {index} is {}, every record must be an object",
                json_type_name(record)
            )));
        };
        for name in fields.keys() {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        rows.push(fields);
    }

    let mut columns: Vec<Column> = names
        .iter()
        .map(|name| Column {
            name: name.to_string(),
            values: Vec::with_capacity(rows.len()),
        })
        .collect();
    for (row, fields) in rows.iter().enumerate() {
        for column in columns.iter_mut() {
            let value = fields
                .get(&column.name)
                .ok_or_else(|| ChartError::IncompleteRecord {
                    row,
                    column: column.name.clone(),
                })?;
            column.values.push(scalar(value, &column.name, row)?);
        }
    }

    CanonicalDataset::new(columns)
}

fn from_columns(columns: &Map<String, Value>) -> Result<CanonicalDataset, ChartError> {
    let mut out = Vec::with_capacity(columns.len());
    for (name, values) in columns {
        let Value::Array(values) = values else {
            return Err(ChartError::UnsupportedDataFormat(format!(
                "column '{name}' is {}, every column must be an array",
                json_type_name(values)
            )));
        };
        let values = values
            .iter()
            .enumerate()
            .map(|(row, v)| scalar(v, name, row))
            .collect::<Result<Vec<_>, _>>()?;
        out.push(Column {
            name: name.clone(),
            values,
        });
    }

    CanonicalDataset::new(out)
}

fn scalar(value: &Value, column: &str, row: usize) -> Result<Scalar, ChartError> {
    Scalar::from_value(value).ok_or_else(|| {
        ChartError::UnsupportedDataFormat(format!(
            "row {row} of column '{column}' holds {}, cells must be scalars",
            json_type_name(value)
        ))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    fn kind(input: Value) -> ErrorKind {
        normalize(&input).unwrap_err().kind()
    }

    #[test]
    fn test_records_keep_column_order_and_types() {
        let dataset = normalize(&json!([
            {"year": 2020, "value": 100.5, "label": "a", "flag": true},
            {"year": 2021, "value": null, "label": "b", "flag": false},
        ]))
        .unwrap();

        assert_eq!(dataset.column_names(), vec!["year", "value", "label", "flag"]);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.column("value").unwrap().values[1], Scalar::Null);
        assert_eq!(
            dataset.column("flag").unwrap().values[0],
            Scalar::Bool(true)
        );
    }

    #[test]
    fn test_records_and_columns_agree() {
        let records = json!([{"year": 2020, "value": 100}, {"year": 2021, "value": 150}]);
        let from_records = normalize(&records).unwrap();
        let from_columns = normalize(&from_records.to_columnar_json()).unwrap();

        assert_eq!(from_records, from_columns);
        assert_eq!(from_columns.to_records_json(), records);
    }

    #[test]
    fn test_json_string_is_decoded() {
        let dataset = normalize(&json!("{\"a\": [1, 2], \"b\": [\"x\", \"y\"]}")).unwrap();
        assert_eq!(dataset.column_count(), 2);
        assert_eq!(dataset.row_count(), 2);
    }

    #[test]
    fn test_column_length_mismatch() {
        let err = normalize(&json!({"year": [2020, 2021], "value": [100]})).unwrap_err();
        assert_eq!(
            err,
            ChartError::ColumnLengthMismatch {
                column: "value".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_record_missing_a_column() {
        let err = normalize(&json!([{"a": 1, "b": 2}, {"a": 3}])).unwrap_err();
        assert_eq!(
            err,
            ChartError::IncompleteRecord {
                row: 1,
                column: "b".into()
            }
        );

        // a column introduced late is missing from the earlier rows
        let err = normalize(&json!([{"a": 1}, {"a": 3, "b": 4}])).unwrap_err();
        assert_eq!(err.path().as_deref(), Some("data[0].b"));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(kind(json!([])), ErrorKind::EmptyDataset);
        assert_eq!(kind(json!({})), ErrorKind::EmptyDataset);
        assert_eq!(kind(json!({"a": []})), ErrorKind::EmptyDataset);
        assert_eq!(kind(json!([{}, {}])), ErrorKind::EmptyDataset);
        assert_eq!(kind(json!("  ")), ErrorKind::EmptyDataset);
    }

    #[test]
    fn test_rejected_shapes() {
        assert_eq!(kind(json!("data/sales.csv")), ErrorKind::UnsupportedDataFormat);
        assert_eq!(kind(json!("report.json")), ErrorKind::UnsupportedDataFormat);
        assert_eq!(
            kind(json!("year,value\n2020,100\n2021,150")),
            ErrorKind::UnsupportedDataFormat
        );
        assert_eq!(kind(json!([1, 2, 3])), ErrorKind::UnsupportedDataFormat);
        assert_eq!(kind(json!({"a": 1})), ErrorKind::UnsupportedDataFormat);
        assert_eq!(kind(json!([{"a": [1]}])), ErrorKind::UnsupportedDataFormat);
        assert_eq!(kind(json!(42)), ErrorKind::UnsupportedDataFormat);
        assert_eq!(kind(json!("\"just text\"")), ErrorKind::UnsupportedDataFormat);
    }

    #[test]
    fn test_malformed_json_string() {
        assert_eq!(kind(json!("[{\"a\": 1,]")), ErrorKind::MalformedDataEncoding);
        assert_eq!(kind(json!("not json")), ErrorKind::MalformedDataEncoding);
    }

    #[test]
    fn test_json_with_slashes_is_not_a_path() {
        let dataset = normalize(&json!("[{\"date\": \"2024/01\", \"value\": 1}]")).unwrap();
        assert_eq!(dataset.row_count(), 1);
    }

    #[test]
    fn test_csv_rendering() {
        let dataset = normalize(&json!({
            "name": ["Smith, J.", "Lee"],
            "score": [1.5, null],
            "active": [true, false],
        }))
        .unwrap();
        assert_eq!(
            dataset.to_csv().unwrap(),
            "name,score,active\n\"Smith, J.\",1.5,true\nLee,,false\n"
        );
    }
}
