//! OAuth token lifecycle for one CRM account.
//!
//! Refresh is always reactive: once at the start of an account's sync and
//! again from the fetch retry loop when the held token has expired.
//! Nothing refreshes in the background.

use crate::api_client::CrmApi;
use crate::error::{SyncError, SyncResult};
use crate::types::{Account, TokenGrant, TokenRequest};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// OAuth app credentials used for the token exchange.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

struct TokenState {
    access_token: String,
    refresh_token: String,
    /// Unknown until the first successful refresh.
    expires_at: Option<DateTime<Utc>>,
}

/// Holds and refreshes the access token of a single account.
pub struct CredentialManager {
    api: Arc<dyn CrmApi>,
    client: ClientCredentials,
    state: RwLock<TokenState>,
}

impl CredentialManager {
    /// Starts from the tokens cached on the account.
    pub fn new(api: Arc<dyn CrmApi>, client: ClientCredentials, account: &Account) -> Self {
        Self {
            api,
            client,
            state: RwLock::new(TokenState {
                access_token: account.access_token.clone(),
                refresh_token: account.refresh_token.clone(),
                expires_at: None,
            }),
        }
    }

    /// Performs exactly one refresh-token exchange.
    pub async fn refresh(&self) -> SyncResult<TokenGrant> {
        let request = {
            let state = self.state.read().await;
            TokenRequest::refresh(
                &self.client.client_id,
                &self.client.client_secret,
                &state.refresh_token,
            )
        };

        let grant = self.api.create_token(&request).await.map_err(|e| {
            warn!("access token refresh failed: {e}");
            e
        })?;

        let expires_at = TimeDelta::try_seconds(grant.expires_in)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                warn!(expires_in = grant.expires_in, "token response has an unusable lifetime");
                SyncError::Auth(format!("invalid expires_in: {}", grant.expires_in))
            })?;

        let mut state = self.state.write().await;
        state.access_token = grant.access_token.clone();
        if let Some(rotated) = &grant.refresh_token {
            state.refresh_token = rotated.clone();
        }
        state.expires_at = Some(expires_at);

        debug!(%expires_at, "refreshed access token");
        Ok(grant)
    }

    /// True once `at` is past the expiry of the held token.
    ///
    /// A token whose expiry was never learned counts as valid.
    pub async fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.state
            .read()
            .await
            .expires_at
            .is_some_and(|expires_at| at > expires_at)
    }

    /// Refreshes only if the token is expired at `at`. Returns whether a
    /// refresh happened.
    pub async fn refresh_if_expired(&self, at: DateTime<Utc>) -> SyncResult<bool> {
        if !self.is_expired(at).await {
            return Ok(false);
        }
        debug!("access token expired, refreshing before retry");
        self.refresh().await?;
        Ok(true)
    }

    pub async fn access_token(&self) -> String {
        self.state.read().await.access_token.clone()
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.expires_at
    }

    /// Copies changed tokens back onto the account. Returns true if
    /// anything changed.
    pub async fn apply_to(&self, account: &mut Account) -> bool {
        let state = self.state.read().await;
        let mut changed = false;

        if account.access_token != state.access_token {
            account.access_token = state.access_token.clone();
            changed = true;
        }
        if account.refresh_token != state.refresh_token {
            account.refresh_token = state.refresh_token.clone();
            changed = true;
        }

        changed
    }
}
