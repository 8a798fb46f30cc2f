//! Incremental, paginated search over one entity collection.
//!
//! Pages are sorted ascending on the modification-date property so the
//! cursor stays stable. The search endpoint refuses offsets past a fixed
//! ceiling; when a cursor reaches it the fetch restarts from offset zero
//! with the lower date bound moved up to the last record seen. If that
//! bound cannot move, the fetch fails rather than report a partial window
//! as complete.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::types::*;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Position within one fetch loop. Never moves backwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageCursor {
    /// Opaque continuation token from the previous page.
    pub after: Option<String>,
    /// Lower bound of the date filter; `None` pulls from the beginning.
    pub modified_since: Option<DateTime<Utc>>,
}

/// What [`PageCursor::advance`] decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorStep {
    /// Continue with the API's continuation token.
    Next,
    /// Offset ceiling hit; restarted from a later lower bound.
    Restarted,
    /// No further pages.
    Done,
    /// Offset ceiling hit but the lower bound cannot move forward, so the
    /// rest of the window is unreachable.
    Stalled,
}

impl PageCursor {
    pub fn starting_at(watermark: Option<DateTime<Utc>>) -> Self {
        Self {
            after: None,
            modified_since: watermark,
        }
    }

    /// Moves past a page given the API's continuation token and the last
    /// record of that page.
    pub fn advance(
        &mut self,
        next_after: Option<&str>,
        last: Option<&RawRecord>,
        offset_ceiling: u64,
    ) -> CursorStep {
        let Some(after) = next_after else {
            return CursorStep::Done;
        };

        let at_ceiling = after
            .parse::<u64>()
            .is_ok_and(|offset| offset >= offset_ceiling);
        if !at_ceiling {
            self.after = Some(after.to_string());
            return CursorStep::Next;
        }

        let Some(last) = last else {
            warn!(after, "offset ceiling reached on an empty page");
            return CursorStep::Stalled;
        };

        let restart_from = match self.modified_since {
            Some(current) if last.updated_at <= current => {
                warn!(
                    modified_since = %current,
                    last_updated = %last.updated_at,
                    "offset ceiling reached without moving the lower bound"
                );
                return CursorStep::Stalled;
            }
            _ => last.updated_at,
        };

        self.after = None;
        self.modified_since = Some(restart_from);
        CursorStep::Restarted
    }
}

/// Builds the `[lower, upper]` filter on `property`, as epoch milliseconds.
pub fn date_range_filter(
    property: &str,
    lower: Option<DateTime<Utc>>,
    upper: DateTime<Utc>,
) -> FilterGroup {
    let mut filters = Vec::with_capacity(2);
    if let Some(lower) = lower {
        filters.push(Filter {
            property_name: property.to_string(),
            operator: FilterOperator::Gte,
            value: lower.timestamp_millis().to_string(),
        });
    }
    filters.push(Filter {
        property_name: property.to_string(),
        operator: FilterOperator::Lte,
        value: upper.timestamp_millis().to_string(),
    });
    FilterGroup { filters }
}

/// Lazy page sequence for one entity kind. Call [`PageFetcher::next_page`]
/// until it returns `None`.
pub struct PageFetcher<'a> {
    ctx: &'a SyncContext,
    kind: EntityKind,
    upper_bound: DateTime<Utc>,
    cursor: PageCursor,
    finished: bool,
    pages: usize,
}

impl<'a> PageFetcher<'a> {
    /// `now` is the fixed upper bound for the whole loop.
    pub fn new(
        ctx: &'a SyncContext,
        kind: EntityKind,
        watermark: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            ctx,
            kind,
            upper_bound: now,
            cursor: PageCursor::starting_at(watermark),
            finished: false,
            pages: 0,
        }
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn upper_bound(&self) -> DateTime<Utc> {
        self.upper_bound
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// The query for the page at the current cursor.
    pub fn search_request(&self) -> SearchRequest {
        let property = self.kind.date_property();
        SearchRequest {
            filter_groups: vec![date_range_filter(
                property,
                self.cursor.modified_since,
                self.upper_bound,
            )],
            sorts: vec![SortOrder {
                property_name: property.to_string(),
                direction: SortDirection::Ascending,
            }],
            properties: self.kind.properties().iter().map(|p| p.to_string()).collect(),
            limit: self.ctx.page_size,
            after: self.cursor.after.clone(),
        }
    }

    /// Fetches the next page, retrying per the context's policy.
    ///
    /// Fails with [`SyncError::PaginationStalled`] when the offset ceiling
    /// is reached and no later lower bound exists; the window is then
    /// incomplete and must not be treated as fetched.
    pub async fn next_page(&mut self) -> SyncResult<Option<Vec<RawRecord>>> {
        if self.finished {
            return Ok(None);
        }

        let request = self.search_request();
        let ctx = self.ctx;
        let kind = self.kind;
        let request = &request;

        let page = ctx
            .retry
            .run(&format!("search {kind}"), move |attempt| async move {
                if attempt > 1 {
                    ctx.credentials.refresh_if_expired(Utc::now()).await?;
                }
                let token = ctx.credentials.access_token().await;
                ctx.api.search(&token, kind, request).await
            })
            .await?;

        self.pages += 1;

        let step = self.cursor.advance(
            page.next_after(),
            page.results.last(),
            ctx.offset_ceiling,
        );
        match step {
            CursorStep::Done => self.finished = true,
            CursorStep::Stalled => {
                self.finished = true;
                return Err(SyncError::PaginationStalled {
                    kind: kind.to_string(),
                    modified_since: self.cursor.modified_since,
                });
            }
            CursorStep::Restarted => debug!(
                kind = %kind,
                restart_from = ?self.cursor.modified_since,
                "offset ceiling reached, restarting pagination"
            ),
            CursorStep::Next => {}
        }

        Ok(Some(page.results))
    }
}
