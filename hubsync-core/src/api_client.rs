//! HTTP client for the HubSpot CRM API.
//!
//! Covers the three calls the pipeline needs: the OAuth refresh-token
//! exchange, per-collection search, and the associations batch read.
//! Access tokens are passed in per call; the client itself holds no auth
//! state, so one instance can serve every account in a run.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Remote CRM operations the pipeline depends on.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Exchanges a refresh token for a fresh access token.
    async fn create_token(&self, request: &TokenRequest) -> SyncResult<TokenGrant>;

    /// Runs one search page query against `kind`.
    async fn search(
        &self,
        access_token: &str,
        kind: EntityKind,
        request: &SearchRequest,
    ) -> SyncResult<SearchPage>;

    /// Reads associations `from` → `to` for a batch of object ids.
    async fn read_associations(
        &self,
        access_token: &str,
        from: EntityKind,
        to: EntityKind,
        ids: &[String],
    ) -> SyncResult<Vec<Association>>;
}

/// reqwest-backed [`CrmApi`] for HubSpot.
pub struct HubSpotClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct AssociationBatch {
    #[serde(default)]
    results: Vec<Association>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl HubSpotClient {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Builds an error message from a non-success response, preferring the
/// API's own `message` field.
async fn describe_failure(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body);
    format!("HTTP {status}: {message}")
}

#[async_trait]
impl CrmApi for HubSpotClient {
    async fn create_token(&self, request: &TokenRequest) -> SyncResult<TokenGrant> {
        let resp = self
            .client
            .post(self.url("/oauth/v1/token"))
            .form(request)
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SyncError::Auth(describe_failure(resp).await));
        }

        resp.json()
            .await
            .map_err(|e| SyncError::Auth(format!("invalid token response: {e}")))
    }

    async fn search(
        &self,
        access_token: &str,
        kind: EntityKind,
        request: &SearchRequest,
    ) -> SyncResult<SearchPage> {
        let path = format!("/crm/v3/objects/{kind}/search");
        debug!(path = %path, after = ?request.after, "search request");

        let resp = self
            .client
            .post(self.url(&path))
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(SyncError::EntityNotSupported(kind.to_string())),
            status if status.is_success() => Ok(resp.json().await?),
            _ => Err(SyncError::Api(describe_failure(resp).await)),
        }
    }

    async fn read_associations(
        &self,
        access_token: &str,
        from: EntityKind,
        to: EntityKind,
        ids: &[String],
    ) -> SyncResult<Vec<Association>> {
        let path = format!(
            "/crm/v3/associations/{}/{}/batch/read",
            from.as_str().to_uppercase(),
            to.as_str().to_uppercase()
        );
        let inputs: Vec<ObjectRef> = ids.iter().map(|id| ObjectRef { id: id.clone() }).collect();

        let resp = self
            .client
            .post(self.url(&path))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "inputs": inputs }))
            .send()
            .await
            .map_err(|e| SyncError::AssociationLookup(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SyncError::AssociationLookup(describe_failure(resp).await));
        }

        let batch: AssociationBatch = resp
            .json()
            .await
            .map_err(|e| SyncError::AssociationLookup(format!("invalid response: {e}")))?;
        Ok(batch.results)
    }
}
