use std::time::Instant;

use super::{ChartOperations, finish};
use crate::{error::ChartError, outcome::ChartPublished};

impl ChartOperations {
    /// Publishes a draft, or re-publishes an already published chart.
    pub async fn publish_chart(&self, chart_id: &str) -> Result<ChartPublished, ChartError> {
        let start = Instant::now();
        tracing::info!(chart_id, "Publishing chart");

        let result = self.try_publish(chart_id).await;
        finish("publish_chart", Some(chart_id), start, result)
    }

    async fn try_publish(&self, chart_id: &str) -> Result<ChartPublished, ChartError> {
        let chart = self.live_chart(chart_id).await?;
        let published = self
            .client
            .publish_chart(&chart.id)
            .await
            .map_err(|fault| fault.into_chart_error(Some(chart_id)))?;
        tracing::debug!(chart_id, version = published.version, "Remote publish finished");

        Ok(ChartPublished {
            chart_id: chart.id,
            public_url: published.public_url,
            message: "Chart published successfully!".to_string(),
        })
    }
}
