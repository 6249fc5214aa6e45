//! Cache layer abstraction.
//!
//! The cache is a pure accelerator in front of the reference store: every
//! entry is reconstructible from PostgreSQL at any time, and each
//! operation class carries its own TTL. Keys are deterministic strings
//! built from the operation name and its parameters, so concurrent
//! populators racing on the same miss write identical values.

pub mod memory;
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;

/// Key-value cache with per-entry TTLs and pattern invalidation.
///
/// Implementations must be `Send + Sync`; the service shares one client
/// across all in-flight requests.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a serialized value, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a serialized value with a TTL in seconds.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Delete all keys matching a glob-style pattern (`prefix*`).
    /// Returns the number of keys removed.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64>;
}

pub fn code_key(code: &str) -> String {
    format!("unspsc_code:{}", code)
}

pub fn etim_key(class_code: &str, version: &str) -> String {
    format!("etim_class:{}:{}", class_code, version)
}

pub fn search_key(
    term: &str,
    segment: Option<&str>,
    family: Option<&str>,
    limit: i64,
    include_hierarchy: bool,
) -> String {
    format!(
        "unspsc_search:{}:{}:{}:{}:{}",
        term.to_lowercase(),
        segment.unwrap_or("-"),
        family.unwrap_or("-"),
        limit,
        if include_hierarchy { "h" } else { "-" }
    )
}

pub fn hierarchy_key(code: &str) -> String {
    format!("unspsc_hierarchy:{}", code)
}

pub fn children_key(parent: &str) -> String {
    format!("unspsc_children:{}", parent)
}

pub fn similar_key(code: &str, limit: i64) -> String {
    format!("unspsc_similar:{}:{}", code, limit)
}
