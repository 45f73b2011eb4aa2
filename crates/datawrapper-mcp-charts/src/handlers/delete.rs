use std::time::Instant;

use super::{ChartOperations, finish};
use crate::{error::ChartError, outcome::ChartDeleted};

impl ChartOperations {
    /// Deletes a chart. Deleting an already deleted chart is `ChartNotFound`.
    pub async fn delete_chart(&self, chart_id: &str) -> Result<ChartDeleted, ChartError> {
        let start = Instant::now();
        tracing::info!(chart_id, "Deleting chart");

        let result = self.try_delete(chart_id).await;
        finish("delete_chart", Some(chart_id), start, result)
    }

    async fn try_delete(&self, chart_id: &str) -> Result<ChartDeleted, ChartError> {
        let chart = self.live_chart(chart_id).await?;
        self.client
            .delete_chart(&chart.id)
            .await
            .map_err(|fault| fault.into_chart_error(Some(chart_id)))?;

        Ok(ChartDeleted {
            chart_id: chart.id,
            message: "Chart deleted successfully!".to_string(),
        })
    }
}
