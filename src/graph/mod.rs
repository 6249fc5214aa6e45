//! Knowledge-graph mirror abstraction.
//!
//! The graph store holds UNSPSC codes as nodes plus relationship edges to
//! product/task entities. It is a derived, eventually-consistent
//! projection: updated by explicit service calls, never by triggers, and
//! always rebuildable from the reference store.

pub mod memory;
pub mod neo4j;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RelationshipSpec;

/// Idempotent MERGE-style upserts for code nodes and their relationships.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Upsert the node for a code, keyed by code identity.
    async fn upsert_code_node(&self, code: &str, title: &str, level: i32) -> Result<()>;

    /// Upsert the target node and a directed, timestamped edge from the
    /// code node to it.
    async fn upsert_relationship(&self, code: &str, rel: &RelationshipSpec) -> Result<()>;
}

/// Restrict a caller-supplied edge or node label to a safe Cypher
/// identifier. Labels cannot be parameterized in Cypher, so they are
/// interpolated after sanitizing.
pub fn sanitize_label(label: &str, fallback: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.bytes().all(|b| b == b'_') {
        fallback.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("classifies", "RELATED_TO"), "CLASSIFIES");
        assert_eq!(sanitize_label("used by", "RELATED_TO"), "USED_BY");
        assert_eq!(sanitize_label("", "RELATED_TO"), "RELATED_TO");
        assert_eq!(sanitize_label("); DROP", "RELATED_TO"), "___DROP");
    }
}
