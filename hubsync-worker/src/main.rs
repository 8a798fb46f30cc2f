use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hubsync_core::api_client::HubSpotClient;
use hubsync_core::sink::HttpActionSink;
use hubsync_core::store::JsonFileTenantStore;
use hubsync_core::{SyncConfig, SyncEngine};
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_target(true).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = SyncConfig::from_env().context("loading sync configuration")?;
    let tenant_file =
        std::env::var("HUBSYNC_TENANT_FILE").unwrap_or_else(|_| "tenant.json".to_string());
    let sink_url = std::env::var("HUBSYNC_SINK_URL").context("HUBSYNC_SINK_URL must be set")?;

    tracing::info!(
        service = "hubsync-worker",
        tenant_file = %tenant_file,
        entities = ?config.entities,
        "starting"
    );

    let api = HubSpotClient::new(&config).context("building HubSpot client")?;
    let sink = HttpActionSink::new(sink_url, Duration::from_secs(config.request_timeout_secs))
        .context("building action sink")?;
    let store = JsonFileTenantStore::new(tenant_file);

    let engine = SyncEngine::new(Arc::new(api), Arc::new(store), Arc::new(sink), config);
    let report = engine.run().await.context("sync run aborted")?;

    for account in &report.accounts {
        for failed in account.failed_operations() {
            tracing::warn!(
                hub_id = %account.hub_id,
                operation = %failed.operation,
                error = failed.error.as_deref().unwrap_or_default(),
                "operation did not complete"
            );
        }
        tracing::info!(
            hub_id = %account.hub_id,
            delivered = account.events_delivered,
            "account summary"
        );
    }

    tracing::info!(run_id = %report.run_id, failures = report.failure_count(), "worker finished");
    Ok(())
}
