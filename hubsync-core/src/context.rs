//! Per-account run context handed to the fetcher and transformers.

use crate::api_client::CrmApi;
use crate::config::SyncConfig;
use crate::credential_manager::CredentialManager;
use crate::retry::RetryPolicy;
use std::sync::Arc;

/// Everything one account's sync needs from the outside world.
pub struct SyncContext {
    pub api: Arc<dyn CrmApi>,
    pub credentials: CredentialManager,
    pub retry: RetryPolicy,
    pub page_size: u32,
    pub offset_ceiling: u64,
}

impl SyncContext {
    pub fn new(api: Arc<dyn CrmApi>, credentials: CredentialManager, config: &SyncConfig) -> Self {
        Self {
            api,
            credentials,
            retry: config.retry_policy(),
            page_size: config.page_size,
            offset_ceiling: config.offset_ceiling,
        }
    }
}
