//! Reference data store abstraction.
//!
//! The [`ReferenceStore`] trait covers every read and upsert the
//! classification service and the bulk importer need against the
//! `unspsc_codes`, `etim_classes`, and `product_classifications` tables.
//! PostgreSQL is the system of record; the in-memory implementation exists
//! for tests and mirrors its semantics (including case-insensitive
//! substring search).

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EtimClass, ProductClassification, UnspscCode};

/// Filters for a code search. `segment`/`family` constrain by code prefix.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub segment: Option<String>,
    pub family: Option<String>,
}

/// Authoritative storage for classification reference data.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Fetch one code row by its full-width 8-digit code.
    async fn get_code(&self, code: &str) -> Result<Option<UnspscCode>>;

    /// Case-insensitive substring search over title and description,
    /// optionally constrained by segment/family prefix. Results are
    /// unranked candidates; relevance ordering happens in the service.
    async fn search_codes(
        &self,
        term: &str,
        filter: &SearchFilter,
        limit: i64,
    ) -> Result<Vec<UnspscCode>>;

    /// All codes sharing a significant prefix, ordered by code ascending.
    /// Used for children and sibling queries.
    async fn codes_with_prefix(&self, prefix: &str, limit: i64) -> Result<Vec<UnspscCode>>;

    /// Whether a segment-level row exists for a two-digit segment.
    async fn segment_exists(&self, segment: &str) -> Result<bool>;

    /// Title of the segment-level row for a two-digit segment.
    async fn segment_title(&self, segment: &str) -> Result<Option<String>>;

    /// Idempotent upsert keyed by `code`; refreshes `updated_at`.
    async fn upsert_code(&self, record: &UnspscCode) -> Result<()>;

    async fn count_codes(&self) -> Result<i64>;

    /// Fetch one ETIM class by code and version.
    async fn get_etim_class(&self, class_code: &str, version: &str) -> Result<Option<EtimClass>>;

    /// Idempotent upsert keyed by (`class_code`, `version`).
    async fn upsert_etim_class(&self, record: &EtimClass) -> Result<()>;

    async fn count_etim_classes(&self) -> Result<i64>;

    /// Upsert a product classification keyed by (product, code, class).
    /// Reclassification overwrites confidence, method, and audit fields.
    async fn upsert_classification(&self, record: &ProductClassification) -> Result<()>;
}
