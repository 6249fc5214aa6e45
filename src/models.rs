//! Core data types for the classification service.
//!
//! These mirror the reference tables (`unspsc_codes`, `etim_classes`,
//! `product_classifications`) plus the enriched/scored shapes the service
//! returns to callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hierarchy;

/// ETIM version assumed when a caller does not name one.
pub const DEFAULT_ETIM_VERSION: &str = "9.0";

/// A row from the `unspsc_codes` reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnspscCode {
    /// Full-width 8-digit code, e.g. `"25171501"`.
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    /// Two-digit segment, always present for a valid code.
    pub segment: Option<String>,
    /// Four-digit family prefix, present for level >= 2.
    pub family: Option<String>,
    /// Six-digit class prefix, present for level >= 3.
    pub class_code: Option<String>,
    /// Full 8-digit commodity, present for level == 4.
    pub commodity: Option<String>,
    /// Hierarchy level 1-4.
    pub level: i32,
}

impl UnspscCode {
    /// Build a record from a code and title, deriving the hierarchy
    /// sub-fields and level from the code's zero-structure.
    pub fn from_code(code: &str, title: &str, description: Option<String>) -> Option<Self> {
        let level = hierarchy::level_of(code)?;
        Some(Self {
            code: code.to_string(),
            title: title.to_string(),
            description,
            segment: hierarchy::segment_prefix(code).map(str::to_string),
            family: hierarchy::family_prefix(code).map(str::to_string),
            class_code: hierarchy::class_prefix(code).map(str::to_string),
            commodity: (level == hierarchy::Level::Commodity).then(|| code.to_string()),
            level: level.as_i32(),
        })
    }

    /// Level implied by which sub-fields are populated. Must agree with the
    /// stored `level` and the code's own zero-structure for a healthy row.
    pub fn level_from_fields(&self) -> i32 {
        if self.commodity.is_some() {
            4
        } else if self.class_code.is_some() {
            3
        } else if self.family.is_some() {
            2
        } else {
            1
        }
    }
}

/// A row from the `etim_classes` reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtimClass {
    /// `EC` + 6 digits, unique per version.
    pub class_code: String,
    pub version: String,
    pub description_en: String,
    pub description_de: Option<String>,
    pub description_fr: Option<String>,
    /// Optional parent class forming a tree. Nulled when the parent row is
    /// deleted (ON DELETE SET NULL).
    pub parent_class: Option<String>,
}

/// Association of a product with an UNSPSC code and/or ETIM class.
///
/// Upserted on reclassification, never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductClassification {
    pub product_id: String,
    pub unspsc_code: Option<String>,
    pub etim_class: Option<String>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// How the classification was produced: `"manual"`, `"rule"`, `"ml"`.
    pub method: String,
    /// Epoch seconds.
    pub classified_at: i64,
    pub classified_by: String,
}

/// An [`UnspscCode`] enriched with computed context for callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCode {
    #[serde(flatten)]
    pub record: UnspscCode,
    /// Title of the code's segment-level ancestor, when known.
    pub segment_title: Option<String>,
    /// Whether stored level, sub-fields, and zero-structure all agree.
    pub hierarchy_valid: bool,
    /// Coarse human-readable domain tag derived from the segment.
    pub business_context: String,
    /// True when this response was served from the cache layer.
    pub cache_hit: bool,
}

/// Outcome of a single-record lookup.
///
/// Validation failures and not-found are ordinary outcomes, not errors;
/// only infrastructure faults surface as `Err` (and the service converts
/// most of those to `NotFound` after logging).
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// Input failed format validation before any I/O.
    Invalid,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// A search result with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCode {
    #[serde(flatten)]
    pub record: UnspscCode,
    /// Heuristic relevance rank; higher sorts first.
    pub relevance: i64,
    /// Full-width ancestor codes, attached when the caller asked for
    /// hierarchy context.
    pub hierarchy: Option<Vec<String>>,
}

/// A similar-code result with its similarity in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCode {
    #[serde(flatten)]
    pub record: UnspscCode,
    pub similarity: f64,
}

/// Structured outcome of the business-rule chain. Violations block
/// (`valid == false`); warnings and recommendations are advisory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub rules_checked: u32,
}

/// Caller-supplied context for advisory business rules.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub industry: Option<String>,
}

/// A relationship to mirror into the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    /// Edge label, e.g. `"CLASSIFIES"`, `"USED_BY_TASK"`.
    pub rel_type: String,
    pub target_id: String,
    /// Node label for the target, e.g. `"Product"`, `"Task"`.
    pub target_type: String,
    /// Arbitrary edge properties. BTreeMap keeps serialization
    /// deterministic.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_commodity() {
        let rec = UnspscCode::from_code("25171501", "Drill bits", None).unwrap();
        assert_eq!(rec.level, 4);
        assert_eq!(rec.segment.as_deref(), Some("25"));
        assert_eq!(rec.family.as_deref(), Some("2517"));
        assert_eq!(rec.class_code.as_deref(), Some("251715"));
        assert_eq!(rec.commodity.as_deref(), Some("25171501"));
        assert_eq!(rec.level_from_fields(), 4);
    }

    #[test]
    fn test_from_code_family_has_no_class_fields() {
        let rec = UnspscCode::from_code("25170000", "Transport parts", None).unwrap();
        assert_eq!(rec.level, 2);
        assert!(rec.class_code.is_none());
        assert!(rec.commodity.is_none());
        assert_eq!(rec.level_from_fields(), 2);
    }

    #[test]
    fn test_from_code_rejects_malformed() {
        assert!(UnspscCode::from_code("0012", "bad", None).is_none());
    }

    #[test]
    fn test_enriched_round_trips_through_json() {
        let rec = UnspscCode::from_code("25171501", "Drill bits", None).unwrap();
        let enriched = EnrichedCode {
            record: rec,
            segment_title: Some("Commercial vehicles".to_string()),
            hierarchy_valid: true,
            business_context: "General products and services".to_string(),
            cache_hit: false,
        };
        let json = serde_json::to_string(&enriched).unwrap();
        let back: EnrichedCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, enriched);
    }
}
