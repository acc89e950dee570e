mod ui;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use negotium_core::{ApiClient, ClientConfig};
use ui::app::ConsoleApp;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,negotium=debug,negotium_core=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Negotium starting...");

    let config = ClientConfig::load();
    let api_client =
        ApiClient::from_config(&config).context("failed to set up the negotiation backend client")?;

    tracing::info!("Backend API: {}", api_client.base_url());
    if !config.enforce_time_limit {
        tracing::debug!("Session clock is advisory; set NEGOTIUM_ENFORCE_TIME_LIMIT=1 to enforce it");
    }

    ConsoleApp::new(config, api_client)?.run()
}
