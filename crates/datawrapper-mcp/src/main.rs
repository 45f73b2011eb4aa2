mod logging;
mod settings;

use std::sync::Arc;

use anyhow::Context;
use datawrapper_mcp_charts::{ChartRouter, DatawrapperClient};
use datawrapper_mcp_server::{Server, transport::ByteTransport};
use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;
    logging::init(&settings);
    for warning in &settings.warnings {
        tracing::warn!("{warning}");
    }

    let client = DatawrapperClient::new(settings.client_config())
        .context("failed to build the Datawrapper HTTP client")?;
    if !client.has_token() {
        tracing::warn!(
            "No API token configured; set {} to enable chart operations",
            settings::ACCESS_TOKEN
        );
    }
    tracing::info!(
        api_url = %settings.api_url,
        timeout_secs = settings.timeout.as_secs(),
        "Starting Datawrapper MCP server"
    );

    let router = ChartRouter::new(Arc::new(client));
    let server = Server::new(Box::new(router));
    let transport = ByteTransport::new(tokio::io::stdin(), tokio::io::stdout());

    server.run(transport).await.context("server stopped")?;
    Ok(())
}
