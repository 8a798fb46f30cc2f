//! Downstream delivery of action batches.

use crate::error::{SyncError, SyncResult};
use crate::types::ActionEvent;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Accepts a batch of action events for one tenant.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn submit(&self, api_key: &str, events: &[ActionEvent]) -> SyncResult<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionBatch<'a> {
    api_key: &'a str,
    actions: &'a [ActionEvent],
}

/// Posts batches as JSON `{ apiKey, actions }` to a fixed endpoint.
pub struct HttpActionSink {
    client: Client,
    endpoint: String,
}

impl HttpActionSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ActionSink for HttpActionSink {
    async fn submit(&self, api_key: &str, events: &[ActionEvent]) -> SyncResult<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&ActionBatch {
                api_key,
                actions: events,
            })
            .send()
            .await
            .map_err(|e| SyncError::Sink(e.to_string()))?;

        resp.error_for_status()
            .map_err(|e| SyncError::Sink(e.to_string()))?;
        Ok(())
    }
}
