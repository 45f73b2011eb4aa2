use super::ChartOperations;
use crate::{error::ChartError, outcome::ChartSchema, registry::ChartTypeRegistry};

impl ChartOperations {
    /// Schema discovery; read-only and local.
    pub fn chart_schema(&self, chart_type: &str) -> Result<ChartSchema, ChartError> {
        let descriptor = ChartTypeRegistry::global().resolve(chart_type)?;
        tracing::debug!(chart_type, "Serving chart schema");

        Ok(ChartSchema {
            chart_type: descriptor.id.to_string(),
            remote_type: descriptor.remote_type.to_string(),
            schema: descriptor.json_schema(),
        })
    }
}
