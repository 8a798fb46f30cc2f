//! Sync orchestrator.
//!
//! Drives one run over every account of the tenant:
//! - credential refresh
//! - one fetch/transform pass per configured entity kind
//! - a single queue drain
//! - tenant persistence
//!
//! Each of those steps is isolated: a failure is logged with account and
//! operation context, recorded in the report, and the run moves on.

use crate::api_client::CrmApi;
use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::credential_manager::{ClientCredentials, CredentialManager};
use crate::error::SyncResult;
use crate::fetcher::PageFetcher;
use crate::outbox::ActionQueue;
use crate::sink::ActionSink;
use crate::store::TenantStore;
use crate::text::capitalize;
use crate::transform::transformer_for;
use crate::types::{Account, EntityKind};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Result of one named operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationOutcome {
    pub operation: String,
    pub error: Option<String>,
}

impl OperationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// What happened to one account during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountReport {
    pub hub_id: String,
    pub operations: Vec<OperationOutcome>,
    pub events_delivered: usize,
}

impl AccountReport {
    fn new(hub_id: &str) -> Self {
        Self {
            hub_id: hub_id.to_string(),
            operations: Vec::new(),
            events_delivered: 0,
        }
    }

    pub fn operation(&self, name: &str) -> Option<&OperationOutcome> {
        self.operations.iter().find(|o| o.operation == name)
    }

    pub fn failed_operations(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.operations.iter().filter(|o| !o.succeeded())
    }
}

/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub accounts: Vec<AccountReport>,
}

impl SyncReport {
    pub fn failure_count(&self) -> usize {
        self.accounts
            .iter()
            .map(|a| a.failed_operations().count())
            .sum()
    }
}

/// Runs `fut`, logging and recording a failure instead of propagating it.
async fn try_operation<T, Fut>(
    report: &mut AccountReport,
    api_key: &str,
    operation: &str,
    fut: Fut,
) -> Option<T>
where
    Fut: Future<Output = SyncResult<T>>,
{
    match fut.await {
        Ok(value) => {
            report.operations.push(OperationOutcome {
                operation: operation.to_string(),
                error: None,
            });
            Some(value)
        }
        Err(e) => {
            error!(
                api_key,
                hub_id = %report.hub_id,
                operation,
                error = %e,
                "operation failed"
            );
            report.operations.push(OperationOutcome {
                operation: operation.to_string(),
                error: Some(e.to_string()),
            });
            None
        }
    }
}

/// Pulls every page of `kind` changed since `watermark` into `queue`.
///
/// Returns the upper bound of the fetch window, which becomes the new
/// watermark once the account's queue has been delivered.
pub async fn process_entity(
    ctx: &SyncContext,
    kind: EntityKind,
    watermark: Option<DateTime<Utc>>,
    queue: &mut ActionQueue,
) -> SyncResult<DateTime<Utc>> {
    info!(kind = %kind, "processing entity");

    let transformer = transformer_for(kind);
    let mut fetcher = PageFetcher::new(ctx, kind, watermark, Utc::now());

    while let Some(page) = fetcher.next_page().await? {
        debug!(kind = %kind, records = page.len(), "fetched batch");
        for event in transformer.transform(ctx, &page, watermark).await? {
            queue.push(event);
        }
    }

    Ok(fetcher.upper_bound())
}

/// Orchestrates a full sync run over the stored tenant.
pub struct SyncEngine {
    api: Arc<dyn CrmApi>,
    store: Arc<dyn TenantStore>,
    sink: Arc<dyn ActionSink>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        api: Arc<dyn CrmApi>,
        store: Arc<dyn TenantStore>,
        sink: Arc<dyn ActionSink>,
        config: SyncConfig,
    ) -> Self {
        Self {
            api,
            store,
            sink,
            config,
        }
    }

    /// Runs one pass over every account.
    ///
    /// Only failing to load the tenant is an error; everything after that is
    /// isolated per operation and reported in the returned [`SyncReport`].
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let run_id = Uuid::now_v7();
        info!(%run_id, "start pulling data from HubSpot");

        let mut tenant = self.store.find_one_tenant().await?;
        let api_key = tenant.api_key.clone();
        let mut accounts = Vec::with_capacity(tenant.accounts.len());

        for index in 0..tenant.accounts.len() {
            let mut report = self
                .sync_account(&api_key, &mut tenant.accounts[index])
                .await;

            try_operation(&mut report, &api_key, "saveTenant", self.store.persist(&tenant)).await;

            info!(hub_id = %report.hub_id, "finish processing account");
            accounts.push(report);
        }

        let report = SyncReport { run_id, accounts };
        info!(
            %run_id,
            accounts = report.accounts.len(),
            failures = report.failure_count(),
            "finished pulling data from HubSpot"
        );
        Ok(report)
    }

    async fn sync_account(&self, api_key: &str, account: &mut Account) -> AccountReport {
        info!(hub_id = %account.hub_id, "start processing account");

        let credentials = CredentialManager::new(
            self.api.clone(),
            ClientCredentials {
                client_id: self.config.client_id.clone(),
                client_secret: self.config.client_secret.clone(),
            },
            account,
        );
        let ctx = SyncContext::new(self.api.clone(), credentials, &self.config);
        let mut report = AccountReport::new(&account.hub_id);
        let mut queue = ActionQueue::new();

        try_operation(
            &mut report,
            api_key,
            "refreshAccessToken",
            ctx.credentials.refresh(),
        )
        .await;

        let mut completed: Vec<(EntityKind, DateTime<Utc>)> = Vec::new();
        for name in &self.config.entities {
            let operation = format!("process{}", capitalize(name));
            let pass = self.process_named(&ctx, name, account, &mut queue);
            if let Some(done) = try_operation(&mut report, api_key, &operation, pass).await {
                completed.push(done);
            }
        }

        let drained = try_operation(
            &mut report,
            api_key,
            "drainQueue",
            queue.drain(self.sink.as_ref(), api_key),
        )
        .await;

        // Watermarks only move once the events behind them were delivered.
        if let Some(delivered) = drained {
            report.events_delivered = delivered;
            for (kind, until) in completed {
                account.set_last_pulled(kind, until);
            }
        }

        if ctx.credentials.apply_to(account).await {
            debug!(hub_id = %account.hub_id, "account tokens changed");
        }

        report
    }

    async fn process_named(
        &self,
        ctx: &SyncContext,
        name: &str,
        account: &Account,
        queue: &mut ActionQueue,
    ) -> SyncResult<(EntityKind, DateTime<Utc>)> {
        let kind: EntityKind = name.parse()?;
        let until = process_entity(ctx, kind, account.last_pulled(kind), queue).await?;
        Ok((kind, until))
    }
}
