//! Raw CRM records to action events, one transformer per entity kind.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::text::{capitalize, parse_leading_int, singularize};
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Company and meeting events are dated this much before the source
/// timestamp so they sort ahead of related events at the same instant.
pub const ACTION_DATE_SKEW_SECS: i64 = 2;

/// Maps a page of raw records into action events.
#[async_trait]
pub trait EntityTransformer: Send + Sync {
    /// `watermark` is the account's last-pulled instant for this kind.
    async fn transform(
        &self,
        ctx: &SyncContext,
        page: &[RawRecord],
        watermark: Option<DateTime<Utc>>,
    ) -> SyncResult<Vec<ActionEvent>>;
}

/// Transformer for `kind`.
pub fn transformer_for(kind: EntityKind) -> &'static dyn EntityTransformer {
    match kind {
        EntityKind::Contacts => &ContactTransformer,
        EntityKind::Companies => &CompanyTransformer,
        EntityKind::Meetings => &MeetingTransformer,
    }
}

/// Created if the record appeared after the watermark (or there is none),
/// otherwise Updated. Also returns the timestamp backing the event date.
pub fn classify(record: &RawRecord, watermark: Option<DateTime<Utc>>) -> (ChangeKind, DateTime<Utc>) {
    let created = watermark.is_none_or(|w| record.created_at > w);
    if created {
        (ChangeKind::Created, record.created_at)
    } else {
        (ChangeKind::Updated, record.updated_at)
    }
}

/// "Contact Created", "Company Updated", ...
pub fn action_name(kind: EntityKind, change: ChangeKind) -> String {
    format!("{} {change}", capitalize(&singularize(kind.as_str())))
}

pub struct CompanyTransformer;

impl CompanyTransformer {
    pub fn event(record: &RawRecord, watermark: Option<DateTime<Utc>>) -> Option<ActionEvent> {
        record.properties.as_ref()?;

        let (change, at) = classify(record, watermark);
        Some(ActionEvent {
            action_name: action_name(EntityKind::Companies, change),
            action_date: at - Duration::seconds(ACTION_DATE_SKEW_SECS),
            include_in_analytics: false,
            identity: None,
            properties: EventProperties::Company(CompanyProperties {
                company_id: record.id.clone(),
                company_domain: record.property("domain"),
                company_industry: record.property("industry"),
            }),
        })
    }
}

#[async_trait]
impl EntityTransformer for CompanyTransformer {
    async fn transform(
        &self,
        _ctx: &SyncContext,
        page: &[RawRecord],
        watermark: Option<DateTime<Utc>>,
    ) -> SyncResult<Vec<ActionEvent>> {
        Ok(page
            .iter()
            .filter_map(|record| Self::event(record, watermark))
            .collect())
    }
}

pub struct MeetingTransformer;

impl MeetingTransformer {
    pub fn event(record: &RawRecord, watermark: Option<DateTime<Utc>>) -> Option<ActionEvent> {
        record.properties.as_ref()?;

        let (change, at) = classify(record, watermark);
        Some(ActionEvent {
            action_name: action_name(EntityKind::Meetings, change),
            action_date: at - Duration::seconds(ACTION_DATE_SKEW_SECS),
            include_in_analytics: false,
            identity: None,
            properties: EventProperties::Meeting(MeetingProperties {
                meeting_id: record.id.clone(),
                meeting_title: record.property("title"),
                meeting_timestamp: record.property("timestamp"),
            }),
        })
    }
}

#[async_trait]
impl EntityTransformer for MeetingTransformer {
    async fn transform(
        &self,
        _ctx: &SyncContext,
        page: &[RawRecord],
        watermark: Option<DateTime<Utc>>,
    ) -> SyncResult<Vec<ActionEvent>> {
        Ok(page
            .iter()
            .filter_map(|record| Self::event(record, watermark))
            .collect())
    }
}

/// Contacts additionally resolve their primary company through the
/// associations API, one batch call per page.
pub struct ContactTransformer;

impl ContactTransformer {
    /// Builds the event for one contact; `None` when it has no email.
    pub fn event(
        record: &RawRecord,
        watermark: Option<DateTime<Utc>>,
        company_id: Option<&String>,
    ) -> Option<ActionEvent> {
        let email = record.property("email").filter(|e| !e.is_empty())?;

        let first = record.property("firstname").unwrap_or_default();
        let last = record.property("lastname").unwrap_or_default();

        let (change, at) = classify(record, watermark);
        Some(ActionEvent {
            action_name: action_name(EntityKind::Contacts, change),
            action_date: at,
            include_in_analytics: false,
            identity: Some(email),
            properties: EventProperties::Contact(ContactProperties {
                company_id: company_id.cloned(),
                contact_name: format!("{first} {last}").trim().to_string(),
                contact_title: record.property("jobtitle"),
                contact_source: record.property("hs_analytics_source"),
                contact_status: record.property("hs_lead_status"),
                contact_score: record
                    .property("hubspotscore")
                    .and_then(|s| parse_leading_int(&s))
                    .unwrap_or(0),
            }),
        })
    }
}

/// Maps each contact id to the id of its first associated company.
pub async fn resolve_companies(
    ctx: &SyncContext,
    contact_ids: &[String],
) -> SyncResult<HashMap<String, String>> {
    if contact_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let token = ctx.credentials.access_token().await;
    let rows = ctx
        .api
        .read_associations(&token, EntityKind::Contacts, EntityKind::Companies, contact_ids)
        .await
        .map_err(|e| match e {
            SyncError::AssociationLookup(_) => e,
            other => SyncError::AssociationLookup(other.to_string()),
        })?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let from = row.from?;
            let to = row.to.into_iter().next()?;
            Some((from.id, to.id))
        })
        .collect())
}

#[async_trait]
impl EntityTransformer for ContactTransformer {
    async fn transform(
        &self,
        ctx: &SyncContext,
        page: &[RawRecord],
        watermark: Option<DateTime<Utc>>,
    ) -> SyncResult<Vec<ActionEvent>> {
        let ids: Vec<String> = page.iter().map(|c| c.id.clone()).collect();
        let companies = resolve_companies(ctx, &ids).await?;

        Ok(page
            .iter()
            .filter_map(|contact| Self::event(contact, watermark, companies.get(&contact.id)))
            .collect())
    }
}
