//! Validation and merging of chart configuration trees.
//!
//! A configuration is a flat-ish JSON object keyed by the field names of the
//! chart type's schema. Creation requires a complete tree and fills defaults;
//! updates take a partial tree that is merged into the chart's current
//! configuration. Only the resulting difference is sent to the remote service.

use serde_json::{Map, Value, json};

use crate::{
    error::{ChartError, FieldError, ValidationErrors},
    registry::{ChartTypeDescriptor, ChartTypeRegistry, FieldKind, FieldSpec, json_type_name},
};

pub type FieldMap = Map<String, Value>;

/// Key that names the chart type; tolerated in a configuration only when it
/// repeats the chart's own type.
const CHART_TYPE_KEY: &str = "chart_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfiguration {
    descriptor: &'static ChartTypeDescriptor,
    fields: FieldMap,
}

impl ChartConfiguration {
    pub fn chart_type(&self) -> &'static str {
        self.descriptor.id
    }

    pub fn descriptor(&self) -> &'static ChartTypeDescriptor {
        self.descriptor
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Remote document fragment (`title`, `metadata`) for this configuration.
    pub fn to_remote(&self) -> Value {
        encode(&self.descriptor.fields, &self.fields)
    }

    /// Reads a configuration back out of a remote chart document.
    ///
    /// Values the schema cannot express (or that fail validation) are skipped
    /// rather than reported: the remote editor may hold settings this server
    /// never wrote.
    pub fn from_remote(descriptor: &'static ChartTypeDescriptor, document: &Value) -> Self {
        Self {
            descriptor,
            fields: decode(&descriptor.fields, document),
        }
    }
}

/// Validates a complete configuration for a new chart of `chart_type`.
pub fn validate_create(chart_type: &str, tree: &Value) -> Result<ChartConfiguration, ChartError> {
    let descriptor = ChartTypeRegistry::global().resolve(chart_type)?;
    let input = config_object(descriptor, tree)?;

    let mut errors = Vec::new();
    let fields = check_object(&descriptor.fields, &input, "", Mode::Create, &mut errors);
    if !errors.is_empty() {
        return Err(ValidationErrors(errors).into());
    }

    Ok(ChartConfiguration { descriptor, fields })
}

/// Validates `partial` against `chart_type` and merges it into `existing`.
///
/// Scalars and lists replace, nested objects and maps merge key by key, and an
/// explicit `null` clears an optional field.
pub fn validate_update(
    chart_type: &str,
    existing: &ChartConfiguration,
    partial: &Value,
) -> Result<ChartConfiguration, ChartError> {
    let descriptor = ChartTypeRegistry::global().resolve(chart_type)?;
    let input = config_object(descriptor, partial)?;

    let mut errors = Vec::new();
    let patch = check_object(&descriptor.fields, &input, "", Mode::Update, &mut errors);
    if !errors.is_empty() {
        return Err(ValidationErrors(errors).into());
    }

    let mut fields = existing.fields.clone();
    merge(&descriptor.fields, &mut fields, patch);

    let missing: Vec<FieldError> = descriptor
        .required_fields()
        .filter(|spec| !fields.contains_key(spec.name))
        .map(|spec| FieldError::missing(spec.name))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationErrors(missing).into());
    }

    Ok(ChartConfiguration { descriptor, fields })
}

/// Entries that changed between two configurations of the same chart.
/// Removed entries are present as `null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigPatch {
    fields: FieldMap,
}

impl ConfigPatch {
    pub fn between(existing: &ChartConfiguration, merged: &ChartConfiguration) -> Self {
        Self {
            fields: diff(&merged.descriptor.fields, &existing.fields, &merged.fields),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn changed_fields(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn to_remote(&self, descriptor: &ChartTypeDescriptor) -> Value {
        encode(&descriptor.fields, &self.fields)
    }
}

fn config_object(descriptor: &ChartTypeDescriptor, tree: &Value) -> Result<FieldMap, ChartError> {
    let mut input = match tree {
        Value::Object(map) => map.clone(),
        Value::Null => FieldMap::new(),
        other => {
            let error = FieldError::type_mismatch("chart_config", "an object", json_type_name(other));
            return Err(ValidationErrors(vec![error]).into());
        }
    };

    if let Some(requested) = input.remove(CHART_TYPE_KEY) {
        if requested.as_str() != Some(descriptor.id) {
            let error = FieldError::unknown(CHART_TYPE_KEY).with_message(format!(
                "chart_type cannot be changed through the configuration (chart is '{}')",
                descriptor.id
            ));
            return Err(ValidationErrors(vec![error]).into());
        }
    }
    Ok(input)
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Depth-first walk of `specs` over `input`. Returns the accepted entries;
/// problems are appended to `errors`.
fn check_object(
    specs: &[FieldSpec],
    input: &FieldMap,
    prefix: &str,
    mode: Mode,
    errors: &mut Vec<FieldError>,
) -> FieldMap {
    for key in input.keys() {
        if !specs.iter().any(|s| s.name == key.as_str()) {
            errors.push(FieldError::unknown(join(prefix, key)));
        }
    }

    let mut accepted = FieldMap::new();
    for spec in specs {
        let path = join(prefix, spec.name);
        match (input.get(spec.name), mode) {
            (None, Mode::Create) | (Some(Value::Null), _) if spec.required => {
                let error = FieldError::missing(&path);
                errors.push(match mode {
                    Mode::Create => error,
                    Mode::Update => {
                        error.with_message(format!("'{path}' is required and cannot be cleared"))
                    }
                });
            }
            (None | Some(Value::Null), Mode::Create) => {
                if let Some(default) = &spec.default {
                    accepted.insert(spec.name.to_string(), default.clone());
                }
            }
            (None, Mode::Update) => {}
            (Some(Value::Null), Mode::Update) => {
                accepted.insert(spec.name.to_string(), Value::Null);
            }
            (Some(value), _) => {
                if let Some(value) = check_value(&spec.kind, &path, value, mode, errors) {
                    accepted.insert(spec.name.to_string(), value);
                }
            }
        }
    }
    accepted
}

fn check_value(
    kind: &FieldKind,
    path: &str,
    value: &Value,
    mode: Mode,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let mismatch = |errors: &mut Vec<FieldError>| -> Option<Value> {
        errors.push(FieldError::type_mismatch(path, kind.expected(), json_type_name(value)));
        None
    };

    match kind {
        FieldKind::String => match value {
            Value::String(_) => Some(value.clone()),
            _ => mismatch(errors),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            _ => mismatch(errors),
        },
        FieldKind::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => Some(value.clone()),
            Some(s) => {
                errors.push(FieldError::invalid_enum(path, s, allowed));
                None
            }
            None => mismatch(errors),
        },
        FieldKind::Integer { min, max } => {
            let Some(n) = as_integer(value) else {
                return mismatch(errors);
            };
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                errors.push(FieldError::out_of_range(path, bounds(min, max)));
                return None;
            }
            Some(json!(n))
        }
        FieldKind::Number { min, max } => {
            let Some(n) = value.as_f64() else {
                return mismatch(errors);
            };
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                errors.push(FieldError::out_of_range(path, bounds(min, max)));
                return None;
            }
            Some(value.clone())
        }
        FieldKind::List(item) => {
            let Value::Array(items) = value else {
                return mismatch(errors);
            };
            let before = errors.len();
            let checked: Vec<Value> = items
                .iter()
                .enumerate()
                .filter_map(|(i, v)| check_value(item, &format!("{path}[{i}]"), v, mode, errors))
                .collect();
            (errors.len() == before).then_some(Value::Array(checked))
        }
        FieldKind::Map(entry) => {
            let Value::Object(entries) = value else {
                return mismatch(errors);
            };
            let before = errors.len();
            let mut checked = FieldMap::new();
            for (key, v) in entries {
                match (v, mode) {
                    (Value::Null, Mode::Update) => {
                        checked.insert(key.clone(), Value::Null);
                    }
                    (Value::Null, Mode::Create) => {}
                    _ => {
                        if let Some(v) = check_value(entry, &join(path, key), v, mode, errors) {
                            checked.insert(key.clone(), v);
                        }
                    }
                }
            }
            (errors.len() == before).then_some(Value::Object(checked))
        }
        FieldKind::Object(children) => {
            let Value::Object(entries) = value else {
                return mismatch(errors);
            };
            let before = errors.len();
            let checked = check_object(children, entries, path, mode, errors);
            (errors.len() == before).then_some(Value::Object(checked))
        }
    }
}

/// Integral JSON numbers, including floats such as `600.0`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

fn bounds<T: std::fmt::Display>(min: &Option<T>, max: &Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("must be between {min} and {max}"),
        (Some(min), None) => format!("must be at least {min}"),
        (None, Some(max)) => format!("must be at most {max}"),
        (None, None) => "is out of range".to_string(),
    }
}

fn merge(specs: &[FieldSpec], base: &mut FieldMap, patch: FieldMap) {
    for (name, value) in patch {
        if value.is_null() {
            base.remove(&name);
            continue;
        }
        let Some(spec) = specs.iter().find(|s| s.name == name) else {
            continue;
        };
        match (&spec.kind, value, base.get_mut(&name)) {
            (FieldKind::Object(children), Value::Object(patch), Some(Value::Object(current))) => {
                merge(children, current, patch);
            }
            (FieldKind::Map(_), Value::Object(patch), Some(Value::Object(current))) => {
                for (key, v) in patch {
                    if v.is_null() {
                        current.remove(&key);
                    } else {
                        current.insert(key, v);
                    }
                }
            }
            (kind, value, _) => {
                let value = strip_nulls(value);
                let nested = matches!(kind, FieldKind::Map(_) | FieldKind::Object(_));
                // clearing keys of a map the chart never had leaves nothing to store
                if !(nested && value.as_object().is_some_and(Map::is_empty)) {
                    base.insert(name, value);
                }
            }
        }
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

fn diff(specs: &[FieldSpec], before: &FieldMap, after: &FieldMap) -> FieldMap {
    let mut changes = FieldMap::new();
    for spec in specs {
        let name = spec.name;
        match (before.get(name), after.get(name)) {
            (Some(_), None) => {
                changes.insert(name.to_string(), Value::Null);
            }
            (None, Some(new)) => {
                changes.insert(name.to_string(), new.clone());
            }
            (Some(old), Some(new)) if old != new => {
                let nested = match (&spec.kind, old, new) {
                    (FieldKind::Object(children), Value::Object(old), Value::Object(new)) => {
                        Value::Object(diff(children, old, new))
                    }
                    (FieldKind::Map(_), Value::Object(old), Value::Object(new)) => {
                        Value::Object(diff_entries(old, new))
                    }
                    _ => new.clone(),
                };
                changes.insert(name.to_string(), nested);
            }
            _ => {}
        }
    }
    changes
}

fn diff_entries(before: &FieldMap, after: &FieldMap) -> FieldMap {
    let mut changes: FieldMap = before
        .keys()
        .filter(|k| !after.contains_key(*k))
        .map(|k| (k.clone(), Value::Null))
        .collect();
    for (key, value) in after {
        if before.get(key) != Some(value) {
            changes.insert(key.clone(), value.clone());
        }
    }
    changes
}

fn get_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(key))
}

fn set_path(root: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = root;
    for key in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.to_string(), value);
    }
}

fn encode(specs: &[FieldSpec], fields: &FieldMap) -> Value {
    let mut document = Value::Object(Map::new());
    encode_into(specs, fields, &mut document, &[]);
    document
}

fn encode_into(specs: &[FieldSpec], fields: &FieldMap, document: &mut Value, base: &[&str]) {
    for spec in specs {
        let Some(value) = fields.get(spec.name) else {
            continue;
        };
        let mut path = base.to_vec();
        path.extend(spec.remote_path());
        match (&spec.kind, value) {
            (FieldKind::Object(children), Value::Object(nested)) => {
                encode_into(children, nested, document, &path);
            }
            _ => set_path(document, &path, value.clone()),
        }
    }
}

fn decode(specs: &[FieldSpec], document: &Value) -> FieldMap {
    let mut fields = FieldMap::new();
    for spec in specs {
        let Some(value) = get_path(document, &spec.remote_path()) else {
            continue;
        };
        let decoded = match &spec.kind {
            FieldKind::Object(children) => {
                let nested = decode(children, value);
                (!nested.is_empty()).then_some(Value::Object(nested))
            }
            FieldKind::Map(entry) => value.as_object().map(|entries| {
                let kept: FieldMap = entries
                    .iter()
                    .filter(|(_, v)| conforms(entry, v))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Value::Object(kept)
            }),
            kind => conforms(kind, value).then(|| value.clone()),
        };
        if let Some(decoded) = decoded {
            fields.insert(spec.name.to_string(), decoded);
        }
    }
    fields
}

fn conforms(kind: &FieldKind, value: &Value) -> bool {
    !value.is_null() && check_value(kind, "", value, Mode::Create, &mut Vec::new()).is_some()
}
