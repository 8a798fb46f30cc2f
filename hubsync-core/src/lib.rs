//! Incremental CRM sync for HubSpot.
//!
//! Pulls contacts, companies and meetings changed since each account's
//! watermark and turns them into action events for an analytics sink:
//! - Cursor pagination with an offset-ceiling restart
//! - Bounded exponential-backoff retry with refresh-on-expiry
//! - Per-entity transformers, including contact → company association
//! - One queued batch per account, delivered after all entity kinds
//! - Per-operation fault isolation across accounts and entity kinds

pub mod api_client;
pub mod config;
pub mod context;
pub mod credential_manager;
pub mod error;
pub mod fetcher;
pub mod outbox;
pub mod retry;
pub mod sink;
pub mod store;
pub mod sync_engine;
pub mod text;
pub mod transform;
pub mod types;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use sync_engine::{SyncEngine, SyncReport};
pub use types::*;
