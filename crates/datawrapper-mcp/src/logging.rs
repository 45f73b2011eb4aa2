use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::{LogFormat, Settings};

/// Installs the global subscriber. Logs go to stderr; stdout is the protocol stream.
pub fn init(settings: &Settings) {
    let (filter, rejected) = match EnvFilter::try_new(&settings.log_level) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new("info"), Some(e)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match settings.log_format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .init(),
    }

    if let Some(e) = rejected {
        tracing::warn!(level = %settings.log_level, error = %e, "Invalid log filter, falling back to info");
    }
}
