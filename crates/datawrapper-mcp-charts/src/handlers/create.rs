use std::time::Instant;

use super::{ChartOperations, finish};
use crate::{
    args::CreateArgs, config::validate_create, dataset::normalize, error::ChartError,
    outcome::ChartCreated,
};

impl ChartOperations {
    /// Creates a draft chart from data and a complete configuration.
    pub async fn create_chart(&self, args: CreateArgs) -> Result<ChartCreated, ChartError> {
        let start = Instant::now();
        tracing::info!(chart_type = %args.chart_type, "Creating chart");

        let result = self.try_create(args).await;
        let chart_id = result.as_ref().ok().map(|c| c.chart_id.clone());
        finish("create_chart", chart_id.as_deref(), start, result)
    }

    async fn try_create(&self, args: CreateArgs) -> Result<ChartCreated, ChartError> {
        let dataset = normalize(&args.data)?;
        let config = validate_create(&args.chart_type, &args.chart_config)?;
        let descriptor = config.descriptor();
        tracing::debug!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Data and configuration accepted"
        );

        let chart = self
            .client
            .create_chart(descriptor.remote_type, config.to_remote())
            .await
            .map_err(|fault| fault.into_chart_error(None))?;

        if let Err(fault) = self.client.upload_data(&chart.id, &dataset).await {
            tracing::warn!(chart_id = %chart.id, "Chart was created but its data upload failed");
            return Err(fault.into_chart_error(Some(&chart.id)));
        }

        Ok(ChartCreated {
            edit_url: self.client.edit_url(&chart.id),
            chart_type: descriptor.id.to_string(),
            title: config.title().unwrap_or_default().to_string(),
            rows: dataset.row_count(),
            columns: dataset.column_count(),
            message: "Chart created successfully!".to_string(),
            chart_id: chart.id,
        })
    }
}
