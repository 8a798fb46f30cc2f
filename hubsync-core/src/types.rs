//! Shared types for CRM sync: tenant state, wire shapes, and action events.

use crate::error::SyncError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ── Entity kinds ──

/// CRM object collections this pipeline knows how to pull.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Contacts,
    Companies,
    Meetings,
}

const COMPANY_PROPERTIES: &[&str] = &[
    "name",
    "domain",
    "country",
    "industry",
    "description",
    "annualrevenue",
    "numberofemployees",
    "hs_lead_status",
];

const CONTACT_PROPERTIES: &[&str] = &[
    "firstname",
    "lastname",
    "jobtitle",
    "email",
    "hubspotscore",
    "hs_lead_status",
    "hs_analytics_source",
    "hs_latest_source",
];

const MEETING_PROPERTIES: &[&str] = &["title", "timestamp"];

impl EntityKind {
    /// Collection name as used in API paths and watermark keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Contacts => "contacts",
            EntityKind::Companies => "companies",
            EntityKind::Meetings => "meetings",
        }
    }

    /// Modification-date property that incremental filters and sorts use.
    pub fn date_property(&self) -> &'static str {
        match self {
            EntityKind::Contacts => "lastmodifieddate",
            EntityKind::Companies | EntityKind::Meetings => "hs_lastmodifieddate",
        }
    }

    /// Properties requested from the search endpoint.
    pub fn properties(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Contacts => CONTACT_PROPERTIES,
            EntityKind::Companies => COMPANY_PROPERTIES,
            EntityKind::Meetings => MEETING_PROPERTIES,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contacts" => Ok(EntityKind::Contacts),
            "companies" => Ok(EntityKind::Companies),
            "meetings" => Ok(EntityKind::Meetings),
            other => Err(SyncError::EntityNotSupported(other.to_string())),
        }
    }
}

// ── Tenant state ──

/// One connected CRM portal and its sync progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub hub_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Per-kind watermark: everything modified before it has been pulled.
    #[serde(default)]
    pub last_pulled_dates: BTreeMap<EntityKind, DateTime<Utc>>,
}

impl Account {
    pub fn last_pulled(&self, kind: EntityKind) -> Option<DateTime<Utc>> {
        self.last_pulled_dates.get(&kind).copied()
    }

    pub fn set_last_pulled(&mut self, kind: EntityKind, at: DateTime<Utc>) {
        self.last_pulled_dates.insert(kind, at);
    }
}

/// The customer whose CRM accounts are being synced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub api_key: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

// ── OAuth ──

/// Form body for the refresh-token exchange.
#[derive(Clone, Debug, Serialize)]
pub struct TokenRequest {
    pub grant_type: &'static str,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl TokenRequest {
    pub fn refresh(client_id: &str, client_secret: &str, refresh_token: &str) -> Self {
        Self {
            grant_type: "refresh_token",
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
        }
    }
}

/// Successful token exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Present when the server rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
}

// ── Search ──

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filter_groups: Vec<FilterGroup>,
    pub sorts: Vec<SortOrder>,
    pub properties: Vec<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilterGroup {
    pub filters: Vec<Filter>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub property_name: String,
    pub operator: FilterOperator,
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterOperator {
    Gte,
    Lte,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOrder {
    pub property_name: String,
    pub direction: SortDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A CRM object as returned by the search endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RawRecord {
    /// Property value as text; `None` for missing or null properties.
    pub fn property(&self, name: &str) -> Option<String> {
        match self.properties.as_ref()?.get(name)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// One page of search results.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<RawRecord>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<NextPage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NextPage {
    pub after: String,
}

impl SearchPage {
    /// Cursor for the following page, if the API reported one.
    pub fn next_after(&self) -> Option<&str> {
        self.paging
            .as_ref()?
            .next
            .as_ref()
            .map(|n| n.after.as_str())
            .filter(|a| !a.is_empty())
    }
}

// ── Associations ──

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

/// One row of an associations batch read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Association {
    #[serde(default)]
    pub from: Option<ObjectRef>,
    #[serde(default)]
    pub to: Vec<ObjectRef>,
}

// ── Action events ──

/// Whether a record is new or changed relative to the watermark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => f.write_str("Created"),
            ChangeKind::Updated => f.write_str("Updated"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompanyProperties {
    pub company_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_industry: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContactProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    pub contact_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_status: Option<String>,
    pub contact_score: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeetingProperties {
    pub meeting_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_timestamp: Option<String>,
}

/// Entity-specific payload; serialized under its own key.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum EventProperties {
    #[serde(rename = "companyProperties")]
    Company(CompanyProperties),
    #[serde(rename = "userProperties")]
    Contact(ContactProperties),
    #[serde(rename = "meetingProperties")]
    Meeting(MeetingProperties),
}

/// Canonical unit delivered to the analytics sink.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    pub action_name: String,
    pub action_date: DateTime<Utc>,
    pub include_in_analytics: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(flatten)]
    pub properties: EventProperties,
}
