//! Persistence seams for content records and redirect edges.
//!
//! The slug and redirect logic only talks to the traits below. `PgStore` is the
//! production backend (`PostgreSQL` via sqlx); `MemoryStore` keeps everything in
//! process memory for local development and tests.
//!
//! Uniqueness of `content_records.slug` and `slug_redirects.old_slug` is the
//! store's job: both backends report a conflicting write as
//! [`StoreError::UniqueViolation`] so callers can tell a lost race from a real
//! failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A content record as far as slug bookkeeping is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted `old_slug -> new_slug` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectEdge {
    pub id: Uuid,
    pub old_slug: String,
    pub new_slug: String,
    /// `None` for manually authored redirects.
    pub record_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRedirect {
    pub old_slug: String,
    pub new_slug: String,
    pub record_id: Option<Uuid>,
    pub note: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Returns `true` for failures where retrying the whole operation is safe
    /// (pool exhaustion, dropped connections).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_record(&self, title: &str, slug: &str) -> Result<ContentRecord, StoreError>;

    async fn find_record(&self, id: Uuid) -> Result<Option<ContentRecord>, StoreError>;

    /// Finds the record that claims `slug`, either as its current slug or as a
    /// historical alias it owns. Records equal to `exclude` are ignored, and
    /// a current-slug match wins over an alias match.
    async fn find_slug_owner(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<ContentRecord>, StoreError>;

    /// Returns every slug starting with `prefix` that another record claims
    /// (current slugs plus owned aliases), in one round-trip.
    async fn taken_slugs_with_prefix(
        &self,
        prefix: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError>;

    /// Sets the record's slug (and title, when given). Returns `None` if the
    /// record does not exist.
    async fn update_record(
        &self,
        id: Uuid,
        slug: &str,
        title: Option<&str>,
    ) -> Result<Option<ContentRecord>, StoreError>;
}

#[async_trait]
pub trait RedirectStore: Send + Sync {
    async fn find_redirect(&self, old_slug: &str) -> Result<Option<RedirectEdge>, StoreError>;

    /// Point lookup of one exact edge owned by `record_id`.
    async fn find_record_redirect(
        &self,
        record_id: Uuid,
        old_slug: &str,
        new_slug: &str,
    ) -> Result<Option<RedirectEdge>, StoreError>;

    /// Ids of at most `limit` edges whose `new_slug` equals `new_slug`.
    async fn redirect_ids_targeting(
        &self,
        new_slug: &str,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Points every edge in `ids` at `new_slug`; returns the number updated.
    async fn retarget_redirects(&self, ids: &[Uuid], new_slug: &str) -> Result<u64, StoreError>;

    async fn insert_redirect(&self, redirect: NewRedirect) -> Result<RedirectEdge, StoreError>;

    async fn delete_redirect(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Deletes edges of `record_id` where `old_slug == new_slug == slug`.
    async fn delete_self_redirects(&self, record_id: Uuid, slug: &str) -> Result<u64, StoreError>;

    /// Lists edges newest first, optionally only those owned by `record_id`.
    async fn list_redirects(&self, record_id: Option<Uuid>)
        -> Result<Vec<RedirectEdge>, StoreError>;
}

#[async_trait]
pub trait Store: RecordStore + RedirectStore {
    /// Cheap liveness probe used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}
