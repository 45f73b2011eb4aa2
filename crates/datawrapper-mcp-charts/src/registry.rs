//! Fixed set of supported chart types and their configuration schemas.
//!
//! Each chart type is an explicit tree of [`FieldSpec`]s built once on first
//! use. A field knows its value kind, whether it is required, its default, and
//! where it lives in the remote chart document, so validation, schema
//! discovery and remote encoding are all driven by the same data.

use once_cell::sync::Lazy;
use serde_json::{Map, Value, json};

use crate::error::ChartError;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer { min: Option<i64>, max: Option<i64> },
    Number { min: Option<f64>, max: Option<f64> },
    Boolean,
    Enum(&'static [&'static str]),
    /// Replaced as a whole on update.
    List(Box<FieldKind>),
    /// Free-form keys (e.g. column name to color); merged key by key on update.
    Map(Box<FieldKind>),
    /// Fixed sub-fields; merged field by field on update.
    Object(Vec<FieldSpec>),
}

impl FieldKind {
    /// Human readable expectation used in type mismatch messages.
    pub fn expected(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Enum(_) => "a string",
            FieldKind::Integer { .. } => "an integer",
            FieldKind::Number { .. } => "a number",
            FieldKind::Boolean => "a boolean",
            FieldKind::List(_) => "an array",
            FieldKind::Map(_) | FieldKind::Object(_) => "an object",
        }
    }

    pub fn json_schema(&self) -> Value {
        match self {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::Integer { min, max } => {
                let mut schema = json!({ "type": "integer" });
                if let Some(min) = min {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            FieldKind::Number { min, max } => {
                let mut schema = json!({ "type": "number" });
                if let Some(min) = min {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
            FieldKind::List(item) => json!({ "type": "array", "items": item.json_schema() }),
            FieldKind::Map(value) => {
                json!({ "type": "object", "additionalProperties": value.json_schema() })
            }
            FieldKind::Object(fields) => object_schema(fields),
        }
    }
}

/// Name of the JSON type of `value`, as reported back to callers.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
    /// Dotted location in the remote chart document, relative to the parent field.
    pub remote: &'static str,
}

impl FieldSpec {
    pub fn new(
        name: &'static str,
        kind: FieldKind,
        remote: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
            remote,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn remote_path(&self) -> Vec<&'static str> {
        self.remote.split('.').collect()
    }

    pub fn json_schema(&self) -> Value {
        let mut schema = self.kind.json_schema();
        schema["description"] = json!(self.description);
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| (f.name.to_string(), f.json_schema()))
        .collect();
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartTypeDescriptor {
    /// Short identifier used by callers, e.g. `line`.
    pub id: &'static str,
    /// Visualization id understood by the remote service, e.g. `d3-lines`.
    pub remote_type: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl ChartTypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn json_schema(&self) -> Value {
        let mut schema = object_schema(&self.fields);
        schema["title"] = json!(self.title);
        schema["description"] = json!(self.description);
        schema
    }
}

static BUILTIN: Lazy<ChartTypeRegistry> = Lazy::new(ChartTypeRegistry::builtin);

/// Read-only after construction; shared freely between concurrent calls.
#[derive(Debug, Clone)]
pub struct ChartTypeRegistry {
    types: Vec<ChartTypeDescriptor>,
}

impl ChartTypeRegistry {
    pub fn global() -> &'static ChartTypeRegistry {
        &BUILTIN
    }

    pub fn new(types: Vec<ChartTypeDescriptor>) -> Self {
        Self { types }
    }

    pub fn resolve(&self, id: &str) -> Result<&ChartTypeDescriptor, ChartError> {
        self.types
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ChartError::unknown_chart_type(id, &self.ids()))
    }

    pub fn schema_of(&self, id: &str) -> Result<Value, ChartError> {
        self.resolve(id).map(ChartTypeDescriptor::json_schema)
    }

    pub fn by_remote_type(&self, remote_type: &str) -> Option<&ChartTypeDescriptor> {
        self.types.iter().find(|t| t.remote_type == remote_type)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.types.iter().map(|t| t.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartTypeDescriptor> {
        self.types.iter()
    }

    /// Every chart type with its schema, as served by the chart-types resource.
    pub fn catalog(&self) -> Value {
        let types: Vec<Value> = self
            .types
            .iter()
            .map(|t| {
                json!({
                    "chart_type": t.id,
                    "remote_type": t.remote_type,
                    "name": t.title,
                    "description": t.description,
                    "schema": t.json_schema(),
                })
            })
            .collect();
        json!({ "chart_types": types })
    }

    fn builtin() -> Self {
        Self::new(vec![
            ChartTypeDescriptor {
                id: "bar",
                remote_type: "d3-bars",
                title: "Bar chart",
                description: "Horizontal bars, one per row",
                fields: with_describe(bar_fields()),
            },
            ChartTypeDescriptor {
                id: "line",
                remote_type: "d3-lines",
                title: "Line chart",
                description: "One line per value column over the first column",
                fields: with_describe(line_fields()),
            },
            ChartTypeDescriptor {
                id: "area",
                remote_type: "d3-area",
                title: "Area chart",
                description: "Filled, optionally stacked areas over the first column",
                fields: with_describe(area_fields()),
            },
            ChartTypeDescriptor {
                id: "arrow",
                remote_type: "d3-arrow-plot",
                title: "Arrow plot",
                description: "Arrows showing the change between a start and an end column",
                fields: with_describe(arrow_fields()),
            },
            ChartTypeDescriptor {
                id: "column",
                remote_type: "column-chart",
                title: "Column chart",
                description: "Vertical columns, one per row",
                fields: with_describe(column_fields()),
            },
            ChartTypeDescriptor {
                id: "multiple_column",
                remote_type: "multiple-columns",
                title: "Multiple column chart",
                description: "Small multiples of column charts, one per value column",
                fields: with_describe(multiple_column_fields()),
            },
            ChartTypeDescriptor {
                id: "scatter",
                remote_type: "d3-scatter-plot",
                title: "Scatter plot",
                description: "Points positioned by an x and a y column",
                fields: with_describe(scatter_fields()),
            },
            ChartTypeDescriptor {
                id: "stacked_bar",
                remote_type: "d3-bars-stacked",
                title: "Stacked bar chart",
                description: "Horizontal bars split into stacked segments",
                fields: with_describe(stacked_bar_fields()),
            },
        ])
    }
}

const GRID: &[&str] = &["off", "ticks", "lines"];
const INTERPOLATION: &[&str] = &[
    "linear",
    "monotone-x",
    "step",
    "step-before",
    "step-after",
    "cardinal",
    "natural",
];
const LEGEND_POSITION: &[&str] = &["top", "right", "bottom", "inside"];
const VALUE_LABELS: &[&str] = &["hover", "always", "off"];
const SYMBOLS: &[&str] = &[
    "symbolCircle",
    "symbolSquare",
    "symbolDiamond",
    "symbolTriangle",
    "symbolCross",
    "symbolStar",
    "symbolWye",
];

fn string(name: &'static str, remote: &'static str, description: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::String, remote, description)
}

fn boolean(name: &'static str, remote: &'static str, description: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Boolean, remote, description)
}

fn one_of(
    name: &'static str,
    values: &'static [&'static str],
    remote: &'static str,
    description: &'static str,
) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Enum(values), remote, description)
}

fn integer(
    name: &'static str,
    min: i64,
    max: i64,
    remote: &'static str,
    description: &'static str,
) -> FieldSpec {
    let kind = FieldKind::Integer {
        min: Some(min),
        max: Some(max),
    };
    FieldSpec::new(name, kind, remote, description)
}

fn range(name: &'static str, remote: &'static str, description: &'static str) -> FieldSpec {
    let item = FieldKind::Number {
        min: None,
        max: None,
    };
    FieldSpec::new(name, FieldKind::List(Box::new(item)), remote, description)
}

fn color_category() -> FieldSpec {
    FieldSpec::new(
        "color_category",
        FieldKind::Map(Box::new(FieldKind::String)),
        "metadata.visualize.color-category.map",
        "Colors per column or row name, e.g. {\"Sales\": \"#1d81a2\"}",
    )
}

fn base_color() -> FieldSpec {
    string(
        "base_color",
        "metadata.visualize.base-color",
        "Default color as a hex code or palette index",
    )
}

fn legend() -> FieldSpec {
    FieldSpec::new(
        "legend",
        FieldKind::Object(vec![
            boolean("enabled", "enabled", "Show the color legend").with_default(json!(true)),
            one_of(
                "position",
                LEGEND_POSITION,
                "position",
                "Where the legend is placed",
            )
            .with_default(json!("top")),
        ]),
        "metadata.visualize.legend",
        "Color legend settings",
    )
}

fn x_grid() -> FieldSpec {
    one_of("x_grid", GRID, "metadata.visualize.x-grid", "Vertical grid lines")
        .with_default(json!("off"))
}

fn y_grid() -> FieldSpec {
    one_of("y_grid", GRID, "metadata.visualize.y-grid", "Horizontal grid lines")
        .with_default(json!("lines"))
}

fn interpolation() -> FieldSpec {
    one_of(
        "interpolation",
        INTERPOLATION,
        "metadata.visualize.interpolation",
        "How points are connected",
    )
    .with_default(json!("linear"))
}

fn custom_range_y() -> FieldSpec {
    range(
        "custom_range_y",
        "metadata.visualize.custom-range-y",
        "Fixed y axis range as [min, max]",
    )
}

fn value_labels() -> FieldSpec {
    one_of(
        "value_labels",
        VALUE_LABELS,
        "metadata.visualize.value-labels",
        "When value labels are shown",
    )
    .with_default(json!("hover"))
}

fn sort_bars() -> FieldSpec {
    boolean("sort_bars", "metadata.visualize.sort-bars", "Sort bars by value")
        .with_default(json!(false))
}

fn reverse_order() -> FieldSpec {
    boolean(
        "reverse_order",
        "metadata.visualize.reverse-order",
        "Reverse the row order",
    )
    .with_default(json!(false))
}

fn show_value_labels() -> FieldSpec {
    boolean(
        "show_value_labels",
        "metadata.visualize.show-values",
        "Print values next to the bars",
    )
    .with_default(json!(true))
}

fn with_describe(mut specific: Vec<FieldSpec>) -> Vec<FieldSpec> {
    let mut fields = vec![
        string("title", "title", "Chart headline").required(),
        string("intro", "metadata.describe.intro", "Description shown below the title"),
        string("byline", "metadata.describe.byline", "Author credit"),
        string("source_name", "metadata.describe.source-name", "Name of the data source"),
        string("source_url", "metadata.describe.source-url", "Link to the data source"),
        string("notes", "metadata.annotate.notes", "Notes shown below the chart"),
        string(
            "aria_description",
            "metadata.describe.aria-description",
            "Alternative text for screen readers",
        ),
        boolean("transpose", "metadata.data.transpose", "Swap rows and columns")
            .with_default(json!(false)),
    ];
    fields.append(&mut specific);
    fields
}

fn bar_fields() -> Vec<FieldSpec> {
    vec![
        base_color(),
        color_category(),
        sort_bars(),
        reverse_order(),
        show_value_labels(),
        string(
            "value_label_format",
            "metadata.visualize.value-label-format",
            "Number format of value labels, e.g. 0,0.[00]",
        ),
        one_of(
            "value_label_alignment",
            &["left", "right"],
            "metadata.visualize.value-label-alignment",
            "Side of the bar the value label sits on",
        ),
        boolean("thick_bars", "metadata.visualize.thick", "Use thicker bars"),
        range(
            "custom_range",
            "metadata.visualize.custom-range",
            "Fixed value axis range as [min, max]",
        ),
    ]
}

fn line_fields() -> Vec<FieldSpec> {
    vec![
        interpolation(),
        color_category(),
        x_grid(),
        y_grid(),
        custom_range_y(),
        string(
            "y_grid_format",
            "metadata.visualize.y-grid-format",
            "Number format of the y axis labels",
        ),
        boolean(
            "show_tooltips",
            "metadata.visualize.show-tooltips",
            "Show tooltips on hover",
        )
        .with_default(json!(true)),
        legend(),
        integer(
            "label_margin",
            0,
            400,
            "metadata.visualize.label-margin",
            "Space reserved for line labels in pixels",
        ),
    ]
}

fn area_fields() -> Vec<FieldSpec> {
    vec![
        interpolation(),
        color_category(),
        x_grid(),
        y_grid(),
        legend(),
        boolean(
            "stack_areas",
            "metadata.visualize.stack-areas",
            "Stack the areas on top of each other",
        )
        .with_default(json!(true)),
        FieldSpec::new(
            "area_opacity",
            FieldKind::Number {
                min: Some(0.0),
                max: Some(1.0),
            },
            "metadata.visualize.area-opacity",
            "Fill opacity between 0 and 1",
        )
        .with_default(json!(0.7)),
        custom_range_y(),
    ]
}

fn arrow_fields() -> Vec<FieldSpec> {
    vec![
        string("start_column", "metadata.axes.start", "Column holding the start values")
            .required(),
        string("end_column", "metadata.axes.end", "Column holding the end values").required(),
        one_of(
            "range_extent",
            &["nice", "data", "custom"],
            "metadata.visualize.range-extent",
            "How the value axis range is chosen",
        )
        .with_default(json!("nice")),
        range(
            "custom_range",
            "metadata.visualize.custom-range",
            "Value axis range when range_extent is custom",
        ),
        boolean(
            "thick_arrows",
            "metadata.visualize.thick-arrows",
            "Use thicker arrows",
        ),
        color_category(),
        boolean(
            "sort_ranges",
            "metadata.visualize.sort-ranges",
            "Sort rows by the size of the change",
        )
        .with_default(json!(false)),
    ]
}

fn column_fields() -> Vec<FieldSpec> {
    vec![
        base_color(),
        color_category(),
        value_labels(),
        custom_range_y(),
        y_grid(),
        integer(
            "bar_padding",
            0,
            100,
            "metadata.visualize.bar-padding",
            "Gap between columns in percent of the column width",
        )
        .with_default(json!(30)),
    ]
}

fn multiple_column_fields() -> Vec<FieldSpec> {
    vec![
        base_color(),
        color_category(),
        value_labels(),
        one_of(
            "grid_layout",
            &["fixedCount", "minimumWidth"],
            "metadata.visualize.grid-layout",
            "How panels are laid out",
        )
        .with_default(json!("fixedCount")),
        integer(
            "grid_columns",
            1,
            12,
            "metadata.visualize.grid-column",
            "Number of panels per row",
        )
        .with_default(json!(2)),
        integer(
            "grid_row_height",
            50,
            1000,
            "metadata.visualize.grid-row-height",
            "Height of each panel row in pixels",
        )
        .with_default(json!(140)),
    ]
}

fn scatter_fields() -> Vec<FieldSpec> {
    vec![
        string("x_column", "metadata.axes.x", "Column for the x position").required(),
        string("y_column", "metadata.axes.y", "Column for the y position").required(),
        string("size_column", "metadata.axes.size", "Column scaling the symbol size"),
        string("color_column", "metadata.axes.color", "Column selecting the symbol color"),
        string("label_column", "metadata.axes.labels", "Column used for point labels"),
        one_of("shape", SYMBOLS, "metadata.visualize.shape", "Symbol drawn per point")
            .with_default(json!("symbolCircle")),
        integer(
            "fixed_size",
            1,
            50,
            "metadata.visualize.fixed-size",
            "Symbol size when no size column is set",
        )
        .with_default(json!(5)),
        boolean(
            "regression",
            "metadata.visualize.regression",
            "Draw a linear regression line",
        )
        .with_default(json!(false)),
        boolean("x_log", "metadata.visualize.x-log", "Logarithmic x axis"),
        boolean("y_log", "metadata.visualize.y-log", "Logarithmic y axis"),
        color_category(),
    ]
}

fn stacked_bar_fields() -> Vec<FieldSpec> {
    vec![
        color_category(),
        sort_bars(),
        reverse_order(),
        show_value_labels(),
        boolean(
            "stack_percentages",
            "metadata.visualize.stack-percentages",
            "Scale every bar to 100 percent",
        )
        .with_default(json!(false)),
        legend(),
    ]
}
