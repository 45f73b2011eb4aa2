//! One handler per chart lifecycle operation.
//!
//! Handlers normalize and validate before the first network call, then drive
//! the remote client and translate its faults. They never retry: mutating
//! calls on the remote service are not idempotent.

mod create;
mod delete;
mod export;
mod publish;
mod retrieve;
mod schema;
mod update;

use std::{sync::Arc, time::Instant};

use crate::{
    client::{ChartClient, ChartState, RemoteChart},
    error::ChartError,
};

#[derive(Clone)]
pub struct ChartOperations {
    client: Arc<dyn ChartClient>,
}

impl ChartOperations {
    pub fn new(client: Arc<dyn ChartClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &dyn ChartClient {
        self.client.as_ref()
    }

    /// Reads a chart that must exist and must not be deleted.
    async fn live_chart(&self, chart_id: &str) -> Result<RemoteChart, ChartError> {
        let chart = self
            .client
            .get_chart(chart_id)
            .await
            .map_err(|fault| fault.into_chart_error(Some(chart_id)))?;
        if chart.state == ChartState::Deleted {
            return Err(ChartError::ChartNotFound {
                chart_id: chart_id.to_string(),
            });
        }
        Ok(chart)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Logs the end of an operation and hands the result back.
fn finish<T>(
    operation: &'static str,
    chart_id: Option<&str>,
    start: Instant,
    result: Result<T, ChartError>,
) -> Result<T, ChartError> {
    let duration_ms = elapsed_ms(start);
    match &result {
        Ok(_) => tracing::info!(operation, chart_id, duration_ms, "Chart operation succeeded"),
        Err(e) => tracing::error!(
            operation,
            chart_id,
            duration_ms,
            error_kind = %e.kind(),
            error = %e,
            "Chart operation failed"
        ),
    }
    result
}
