//! Shared in-memory fakes for pipeline tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_core::api_client::CrmApi;
use hubsync_core::config::SyncConfig;
use hubsync_core::context::SyncContext;
use hubsync_core::credential_manager::{ClientCredentials, CredentialManager};
use hubsync_core::retry::RetryPolicy;
use hubsync_core::sink::ActionSink;
use hubsync_core::store::TenantStore;
use hubsync_core::types::*;
use hubsync_core::{SyncError, SyncResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid timestamp")
}

pub fn record(id: &str, created: i64, updated: i64, properties: serde_json::Value) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        properties: properties.as_object().cloned(),
        created_at: ts(created),
        updated_at: ts(updated),
    }
}

pub fn contact(id: &str, email: &str, created: i64, updated: i64) -> RawRecord {
    record(
        id,
        created,
        updated,
        serde_json::json!({ "email": email, "firstname": "Ada", "lastname": "Lovelace" }),
    )
}

pub fn page(results: Vec<RawRecord>, after: Option<&str>) -> SearchPage {
    SearchPage {
        results,
        paging: after.map(|a| Paging {
            next: Some(NextPage { after: a.to_string() }),
        }),
    }
}

pub fn account(hub_id: &str) -> Account {
    Account {
        hub_id: hub_id.to_string(),
        access_token: format!("cached-{hub_id}"),
        refresh_token: format!("refresh-{hub_id}"),
        last_pulled_dates: Default::default(),
    }
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        client_id: "cid".into(),
        client_secret: "cs".into(),
        ..SyncConfig::default()
    }
}

/// One search call as seen by the fake.
#[derive(Clone, Debug)]
pub struct SearchCall {
    pub kind: EntityKind,
    pub token: String,
    pub request: SearchRequest,
}

/// Scripted CRM: search responses are popped per entity kind; an empty
/// script yields an empty final page.
#[derive(Default)]
pub struct ScriptedCrm {
    searches: Mutex<HashMap<EntityKind, VecDeque<SyncResult<SearchPage>>>>,
    tokens: Mutex<VecDeque<SyncResult<TokenGrant>>>,
    associations: Mutex<HashMap<String, String>>,
    association_error: Mutex<Option<String>>,
    pub search_calls: Mutex<Vec<SearchCall>>,
    pub token_calls: Mutex<Vec<TokenRequest>>,
    pub association_calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedCrm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_page(&self, kind: EntityKind, page: SearchPage) {
        self.push_search(kind, Ok(page));
    }

    pub fn push_search(&self, kind: EntityKind, result: SyncResult<SearchPage>) {
        self.searches
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(result);
    }

    pub fn push_failures(&self, kind: EntityKind, count: usize) {
        for i in 0..count {
            self.push_search(kind, Err(SyncError::Api(format!("network error #{}", i + 1))));
        }
    }

    pub fn push_token(&self, result: SyncResult<TokenGrant>) {
        self.tokens.lock().unwrap().push_back(result);
    }

    pub fn associate(&self, contact_id: &str, company_id: &str) {
        self.associations
            .lock()
            .unwrap()
            .insert(contact_id.to_string(), company_id.to_string());
    }

    pub fn fail_associations(&self, message: &str) {
        *self.association_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn searches_for(&self, kind: EntityKind) -> Vec<SearchCall> {
        self.search_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    pub fn token_call_count(&self) -> usize {
        self.token_calls.lock().unwrap().len()
    }
}

pub fn grant(token: &str, expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: token.to_string(),
        refresh_token: None,
        expires_in,
    }
}

#[async_trait]
impl CrmApi for ScriptedCrm {
    async fn create_token(&self, request: &TokenRequest) -> SyncResult<TokenGrant> {
        let mut calls = self.token_calls.lock().unwrap();
        calls.push(request.clone());
        let n = calls.len();
        drop(calls);

        self.tokens
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(grant(&format!("fresh-{n}"), 1800)))
    }

    async fn search(
        &self,
        access_token: &str,
        kind: EntityKind,
        request: &SearchRequest,
    ) -> SyncResult<SearchPage> {
        self.search_calls.lock().unwrap().push(SearchCall {
            kind,
            token: access_token.to_string(),
            request: request.clone(),
        });

        self.searches
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }

    async fn read_associations(
        &self,
        _access_token: &str,
        _from: EntityKind,
        _to: EntityKind,
        ids: &[String],
    ) -> SyncResult<Vec<Association>> {
        self.association_calls.lock().unwrap().push(ids.to_vec());

        if let Some(message) = self.association_error.lock().unwrap().clone() {
            return Err(SyncError::AssociationLookup(message));
        }

        let known = self.associations.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                known.get(id).map(|company| Association {
                    from: Some(ObjectRef { id: id.clone() }),
                    to: vec![ObjectRef { id: company.clone() }],
                })
            })
            .collect())
    }
}

/// Builds a context for `account` backed by `api`.
pub fn context(api: &Arc<ScriptedCrm>, account: &Account, retry: RetryPolicy) -> SyncContext {
    let api: Arc<dyn CrmApi> = api.clone();
    let credentials = CredentialManager::new(
        api.clone(),
        ClientCredentials {
            client_id: "cid".into(),
            client_secret: "cs".into(),
        },
        account,
    );
    SyncContext {
        api,
        credentials,
        retry,
        page_size: 100,
        offset_ceiling: 9900,
    }
}

/// Captures submitted batches; can be told to reject them.
#[derive(Default)]
pub struct RecordingSink {
    pub batches: Mutex<Vec<(String, Vec<ActionEvent>)>>,
    pub reject: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn submit_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl ActionSink for RecordingSink {
    async fn submit(&self, api_key: &str, events: &[ActionEvent]) -> SyncResult<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(SyncError::Sink("503 Service Unavailable".into()));
        }
        self.batches
            .lock()
            .unwrap()
            .push((api_key.to_string(), events.to_vec()));
        Ok(())
    }
}

/// Tenant store kept in memory; records every persisted snapshot.
pub struct MemoryStore {
    tenant: Mutex<Option<Tenant>>,
    pub persisted: Mutex<Vec<Tenant>>,
}

impl MemoryStore {
    pub fn new(tenant: Tenant) -> Arc<Self> {
        Arc::new(Self {
            tenant: Mutex::new(Some(tenant)),
            persisted: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            tenant: Mutex::new(None),
            persisted: Mutex::new(Vec::new()),
        })
    }

    pub fn last_persisted(&self) -> Option<Tenant> {
        self.persisted.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn find_one_tenant(&self) -> SyncResult<Tenant> {
        self.tenant
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SyncError::Store("no tenant".into()))
    }

    async fn persist(&self, tenant: &Tenant) -> SyncResult<()> {
        self.persisted.lock().unwrap().push(tenant.clone());
        *self.tenant.lock().unwrap() = Some(tenant.clone());
        Ok(())
    }
}
