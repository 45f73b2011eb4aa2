use std::time::Instant;

use super::{ChartOperations, finish};
use crate::{
    args::UpdateArgs,
    config::{ChartConfiguration, ConfigPatch, validate_update},
    dataset::normalize,
    error::ChartError,
    outcome::ChartUpdated,
    registry::ChartTypeRegistry,
};

impl ChartOperations {
    /// Replaces a chart's data and/or merges a partial configuration into it.
    pub async fn update_chart(&self, args: UpdateArgs) -> Result<ChartUpdated, ChartError> {
        let start = Instant::now();
        let chart_id = args.chart_id.clone();
        tracing::info!(
            chart_id = %chart_id,
            has_data = args.data.is_some(),
            has_config = args.chart_config.is_some(),
            "Updating chart"
        );

        let result = self.try_update(args).await;
        finish("update_chart", Some(&chart_id), start, result)
    }

    async fn try_update(&self, args: UpdateArgs) -> Result<ChartUpdated, ChartError> {
        if args.data.is_none() && args.chart_config.is_none() {
            return Err(ChartError::InvalidArguments(
                "update_chart needs 'data' or 'chart_config'".to_string(),
            ));
        }
        let dataset = args.data.as_ref().map(normalize).transpose()?;

        let chart = self.live_chart(&args.chart_id).await?;

        let mut patch = ConfigPatch::default();
        if let Some(partial) = &args.chart_config {
            let registry = ChartTypeRegistry::global();
            let descriptor = registry
                .by_remote_type(&chart.remote_type)
                .ok_or_else(|| ChartError::unknown_chart_type(&chart.remote_type, &registry.ids()))?;
            let existing = ChartConfiguration::from_remote(descriptor, &chart.document);
            let merged = validate_update(descriptor.id, &existing, partial)?;
            patch = ConfigPatch::between(&existing, &merged);

            if patch.is_empty() {
                tracing::debug!(chart_id = %chart.id, "Configuration unchanged");
            } else {
                tracing::debug!(chart_id = %chart.id, fields = ?patch.changed_fields(), "Sending configuration patch");
                self.client
                    .update_chart(&chart.id, patch.to_remote(descriptor))
                    .await
                    .map_err(|fault| fault.into_chart_error(Some(&chart.id)))?;
            }
        }

        if let Some(dataset) = &dataset {
            self.client
                .upload_data(&chart.id, dataset)
                .await
                .map_err(|fault| fault.into_chart_error(Some(&chart.id)))?;
        }

        Ok(ChartUpdated {
            edit_url: self.client.edit_url(&chart.id),
            updated_fields: patch.changed_fields(),
            rows: dataset.as_ref().map(|d| d.row_count()),
            message: "Chart updated successfully!".to_string(),
            chart_id: chart.id,
        })
    }
}
