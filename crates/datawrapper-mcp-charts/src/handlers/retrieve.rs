use std::time::Instant;

use serde_json::Value;

use super::{ChartOperations, finish};
use crate::{
    config::ChartConfiguration, error::ChartError, outcome::ChartInfo, registry::ChartTypeRegistry,
};

impl ChartOperations {
    pub async fn get_chart(&self, chart_id: &str) -> Result<ChartInfo, ChartError> {
        let start = Instant::now();
        tracing::info!(chart_id, "Retrieving chart");

        let result = self.try_get(chart_id).await;
        finish("get_chart", Some(chart_id), start, result)
    }

    async fn try_get(&self, chart_id: &str) -> Result<ChartInfo, ChartError> {
        let chart = self.live_chart(chart_id).await?;

        // charts built in the web editor may use types we cannot describe
        let descriptor = ChartTypeRegistry::global().by_remote_type(&chart.remote_type);
        let (chart_type, config) = match descriptor {
            Some(descriptor) => (
                descriptor.id.to_string(),
                ChartConfiguration::from_remote(descriptor, &chart.document).to_json(),
            ),
            None => (chart.remote_type.clone(), Value::Null),
        };

        Ok(ChartInfo {
            title: chart.title().map(str::to_string),
            edit_url: self.client.edit_url(&chart.id),
            chart_id: chart.id,
            chart_type,
            state: chart.state,
            public_url: chart.public_url,
            config,
        })
    }
}
