use std::time::Instant;

use super::{ChartOperations, finish};
use crate::{
    args::ExportArgs,
    error::ChartError,
    outcome::{ExportedImage, PNG_MIME_TYPE},
};

impl ChartOperations {
    /// Renders a chart as PNG.
    pub async fn export_chart_png(&self, args: ExportArgs) -> Result<ExportedImage, ChartError> {
        let start = Instant::now();
        tracing::info!(chart_id = %args.chart_id, options = ?args.options, "Exporting chart as PNG");

        let chart_id = args.chart_id.clone();
        let result = self.try_export(args).await;
        if let Ok(image) = &result {
            tracing::debug!(chart_id = %chart_id, size_bytes = image.bytes.len(), "PNG received");
        }
        finish("export_chart_png", Some(&chart_id), start, result)
    }

    async fn try_export(&self, args: ExportArgs) -> Result<ExportedImage, ChartError> {
        if let Some(format) = &args.format {
            if !format.eq_ignore_ascii_case("png") {
                return Err(ChartError::UnsupportedExportFormat(format.clone()));
            }
        }

        let chart = self.live_chart(&args.chart_id).await?;
        let bytes = self
            .client
            .export_png(&chart.id, &args.options)
            .await
            .map_err(|fault| fault.into_chart_error(Some(&chart.id)))?;

        Ok(ExportedImage {
            chart_id: chart.id,
            bytes,
            mime_type: PNG_MIME_TYPE,
        })
    }
}
