//! The classification service.
//!
//! Orchestrates lookups across the cache layer, the reference store, and
//! the knowledge-graph mirror. Every read follows the same cache-aside
//! contract: check cache, on miss compute from the store, write back,
//! return. Cache failures degrade to miss behavior; store failures degrade
//! to empty results. Neither crashes the caller — only the importer is
//! allowed to fail loudly.
//!
//! All public operations time themselves against the configured SLA. The
//! SLA is advisory: operations are flagged, never cancelled.
//!
//! Concurrency: the service is shared behind `Arc` and takes no lock
//! around the cache-aside sequence. Two concurrent misses for the same key
//! may both populate the cache; last-write-wins is fine because the value
//! is deterministic, derived from the same source row.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{self, Cache};
use crate::config::Config;
use crate::graph::GraphStore;
use crate::hierarchy;
use crate::metrics::{MetricsBuffer, MetricsSummary, PerformanceMetric};
use crate::models::{
    EnrichedCode, EtimClass, Lookup, ProductClassification, RelationshipSpec, ScoredCode,
    SimilarCode, UnspscCode, ValidationContext, ValidationReport, DEFAULT_ETIM_VERSION,
};
use crate::scoring;
use crate::store::{ReferenceStore, SearchFilter};

/// Cap on rows fetched for a children query; families stay well below it.
const CHILDREN_FETCH_LIMIT: i64 = 1000;

pub struct ClassificationService {
    store: Arc<dyn ReferenceStore>,
    cache: Arc<dyn Cache>,
    graph: Option<Arc<dyn GraphStore>>,
    config: Config,
    metrics: Mutex<MetricsBuffer>,
}

impl ClassificationService {
    pub fn new(
        store: Arc<dyn ReferenceStore>,
        cache: Arc<dyn Cache>,
        graph: Option<Arc<dyn GraphStore>>,
        config: Config,
    ) -> Self {
        Self {
            store,
            cache,
            graph,
            config,
            metrics: Mutex::new(MetricsBuffer::new()),
        }
    }

    // ============ Lookup operations ============

    /// Look up a single code, cache-aside, enriched with computed context.
    ///
    /// Malformed codes return [`Lookup::Invalid`] before any I/O. Missing
    /// codes and store outages both surface as [`Lookup::NotFound`].
    pub async fn get_code(&self, code: &str) -> Result<Lookup<EnrichedCode>> {
        let started = Instant::now();
        if !hierarchy::validate_code_format(code) {
            self.record("validation_error", started, None);
            return Ok(Lookup::Invalid);
        }

        match self.fetch_code(code).await {
            Ok(Some(enriched)) => {
                self.record("get_code", started, Some(enriched.cache_hit));
                Ok(Lookup::Found(enriched))
            }
            Ok(None) => {
                self.record("get_code", started, Some(false));
                Ok(Lookup::NotFound)
            }
            Err(e) => {
                warn!(code, error = %e, "reference store lookup failed");
                self.record("error", started, Some(false));
                Ok(Lookup::NotFound)
            }
        }
    }

    /// Look up an ETIM class by code and version (defaulting to the
    /// current licensed version). Same cache-aside shape as [`get_code`].
    ///
    /// [`get_code`]: ClassificationService::get_code
    pub async fn get_etim_class(
        &self,
        class_code: &str,
        version: Option<&str>,
    ) -> Result<Lookup<EtimClass>> {
        let started = Instant::now();
        if !hierarchy::validate_etim_format(class_code) {
            self.record("validation_error", started, None);
            return Ok(Lookup::Invalid);
        }
        let version = version.unwrap_or(DEFAULT_ETIM_VERSION);

        let key = cache::etim_key(class_code, version);
        if let Some(hit) = self.cache_fetch::<EtimClass>(&key).await {
            self.record("get_etim_class", started, Some(true));
            return Ok(Lookup::Found(hit));
        }

        let row = match self.store.get_etim_class(class_code, version).await {
            Ok(row) => row,
            Err(e) => {
                warn!(class_code, error = %e, "etim lookup failed");
                self.record("error", started, Some(false));
                return Ok(Lookup::NotFound);
            }
        };

        match row {
            Some(record) => {
                self.cache_store(&key, &record, self.config.cache.code_ttl_secs)
                    .await;
                self.record("get_etim_class", started, Some(false));
                Ok(Lookup::Found(record))
            }
            None => {
                self.record("get_etim_class", started, Some(false));
                Ok(Lookup::NotFound)
            }
        }
    }

    // ============ Search ============

    /// Substring search over titles and descriptions, ranked by relevance.
    ///
    /// Results sort by score descending, then code ascending for a
    /// deterministic order. Search entries carry a shorter TTL than direct
    /// lookups since result sets shift as data is corrected.
    pub async fn search(
        &self,
        term: &str,
        segment: Option<&str>,
        family: Option<&str>,
        limit: Option<i64>,
        include_hierarchy: bool,
    ) -> Result<Vec<ScoredCode>> {
        let started = Instant::now();
        let term = term.trim();
        if term.is_empty() {
            self.record("validation_error", started, None);
            return Ok(Vec::new());
        }
        let limit = limit.unwrap_or(self.config.service.search_final_limit);

        let key = cache::search_key(term, segment, family, limit, include_hierarchy);
        if let Some(hit) = self.cache_fetch::<Vec<ScoredCode>>(&key).await {
            self.record("search", started, Some(true));
            return Ok(hit);
        }

        let filter = SearchFilter {
            segment: segment.map(str::to_string),
            family: family.map(str::to_string),
        };
        let candidate_limit = self.config.service.search_candidate_limit.max(limit);
        let candidates = match self.store.search_codes(term, &filter, candidate_limit).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(term, error = %e, "search query failed");
                self.record("error", started, Some(false));
                return Ok(Vec::new());
            }
        };

        let mut results: Vec<ScoredCode> = candidates
            .into_iter()
            .filter_map(|record| {
                let relevance = scoring::relevance(&self.config.scoring, &record, term);
                (relevance > 0).then(|| ScoredCode {
                    hierarchy: include_hierarchy
                        .then(|| hierarchy::ancestor_codes(&record.code)),
                    record,
                    relevance,
                })
            })
            .collect();
        results.sort_by(|a, b| {
            b.relevance
                .cmp(&a.relevance)
                .then(a.record.code.cmp(&b.record.code))
        });
        results.truncate(limit as usize);

        self.cache_store(&key, &results, self.config.cache.search_ttl_secs)
            .await;
        self.record("search", started, Some(false));
        Ok(results)
    }

    // ============ Hierarchy operations ============

    /// Resolve the full ancestry of a code, segment first, the code itself
    /// last. Each ancestor resolves through [`get_code`], so individual
    /// lookups share the same cache; the assembled path is additionally
    /// cached as a unit since ancestry is stable data.
    ///
    /// [`get_code`]: ClassificationService::get_code
    pub async fn get_hierarchy_path(&self, code: &str) -> Result<Vec<EnrichedCode>> {
        let started = Instant::now();
        if !hierarchy::validate_code_format(code) {
            self.record("validation_error", started, None);
            return Ok(Vec::new());
        }

        let key = cache::hierarchy_key(code);
        if let Some(mut hit) = self.cache_fetch::<Vec<EnrichedCode>>(&key).await {
            for entry in &mut hit {
                entry.cache_hit = true;
            }
            self.record("get_hierarchy_path", started, Some(true));
            return Ok(hit);
        }

        let mut path = Vec::new();
        let mut degraded = false;
        for ancestor in hierarchy::ancestor_codes(code) {
            match self.fetch_code(&ancestor).await {
                Ok(Some(record)) => path.push(record),
                Ok(None) => debug!(code, %ancestor, "hierarchy ancestor missing from store"),
                Err(e) => {
                    warn!(code, %ancestor, error = %e, "hierarchy ancestor lookup failed");
                    degraded = true;
                }
            }
        }

        // A path assembled during a store outage is incomplete, not the
        // truth; return it degraded but never cache it.
        if degraded {
            self.record("error", started, Some(false));
            return Ok(path);
        }

        self.cache_store(&key, &path, self.config.cache.hierarchy_ttl_secs)
            .await;
        self.record("get_hierarchy_path", started, Some(false));
        Ok(path)
    }

    /// All descendants sharing the parent's significant prefix, the parent
    /// itself excluded. Commodities are leaves and have no children.
    pub async fn get_children_codes(&self, parent: &str) -> Result<Vec<UnspscCode>> {
        let started = Instant::now();
        let Some(prefix) = hierarchy::child_prefix(parent) else {
            // Either a malformed parent or a leaf commodity.
            let op = if parent.len() == 8 && hierarchy::validate_code_format(parent) {
                "get_children_codes"
            } else {
                "validation_error"
            };
            self.record(op, started, None);
            return Ok(Vec::new());
        };

        let key = cache::children_key(&prefix);
        if let Some(hit) = self.cache_fetch::<Vec<UnspscCode>>(&key).await {
            self.record("get_children_codes", started, Some(true));
            return Ok(hit);
        }

        let parent_code = hierarchy::pad_to_code(&prefix);
        let children: Vec<UnspscCode> = match self
            .store
            .codes_with_prefix(&prefix, CHILDREN_FETCH_LIMIT)
            .await
        {
            Ok(rows) => rows.into_iter().filter(|c| c.code != parent_code).collect(),
            Err(e) => {
                warn!(parent, error = %e, "children query failed");
                self.record("error", started, Some(false));
                return Ok(Vec::new());
            }
        };

        self.cache_store(&key, &children, self.config.cache.hierarchy_ttl_secs)
            .await;
        self.record("get_children_codes", started, Some(false));
        Ok(children)
    }

    /// Family siblings of a code, scored higher when they also share its
    /// 6-digit class prefix, deduplicated and capped at `limit`.
    pub async fn get_similar_codes(&self, code: &str, limit: i64) -> Result<Vec<SimilarCode>> {
        let started = Instant::now();
        if !hierarchy::validate_code_format(code) || limit < 1 {
            self.record("validation_error", started, None);
            return Ok(Vec::new());
        }

        let key = cache::similar_key(code, limit);
        if let Some(hit) = self.cache_fetch::<Vec<SimilarCode>>(&key).await {
            self.record("get_similar_codes", started, Some(true));
            return Ok(hit);
        }

        let family_prefix = &code[..4];
        let class_prefix = &code[..6];
        let fetch_limit = self.config.service.search_candidate_limit.max(limit + 1);

        // Class siblings are fetched on their own first: they score
        // highest and must not be crowded out when a large family gets
        // truncated at the fetch limit.
        let class_rows = match self.store.codes_with_prefix(class_prefix, fetch_limit).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(code, error = %e, "similarity query failed");
                self.record("error", started, Some(false));
                return Ok(Vec::new());
            }
        };
        let family_rows = match self.store.codes_with_prefix(family_prefix, fetch_limit).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(code, error = %e, "similarity query failed");
                self.record("error", started, Some(false));
                return Ok(Vec::new());
            }
        };

        let mut results: Vec<SimilarCode> = class_rows
            .into_iter()
            .filter(|c| c.code != code)
            .map(|record| SimilarCode {
                similarity: scoring::sibling_similarity(&self.config.scoring, true),
                record,
            })
            .collect();
        results.extend(
            family_rows
                .into_iter()
                .filter(|c| c.code != code && !c.code.starts_with(class_prefix))
                .map(|record| SimilarCode {
                    similarity: scoring::sibling_similarity(&self.config.scoring, false),
                    record,
                }),
        );
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.record.code.cmp(&b.record.code))
        });
        results.truncate(limit as usize);

        self.cache_store(&key, &results, self.config.cache.similarity_ttl_secs)
            .await;
        self.record("get_similar_codes", started, Some(false));
        Ok(results)
    }

    // ============ Business rules ============

    /// Run the business-rule chain for a code. Violations block,
    /// recommendations are advisory; neither is an error.
    pub async fn validate_business_rules(
        &self,
        code: &str,
        context: Option<&ValidationContext>,
    ) -> Result<ValidationReport> {
        let started = Instant::now();
        let mut report = ValidationReport::default();

        report.rules_checked += 1;
        if !hierarchy::validate_code_format(code) {
            report
                .violations
                .push(format!("Code '{}' is not a valid 8-digit UNSPSC code", code));
            report.valid = false;
            self.record("validate_business_rules", started, None);
            return Ok(report);
        }

        report.rules_checked += 1;
        let segment = &code[..2];
        match self.store.segment_exists(segment).await {
            Ok(true) => {}
            Ok(false) => report
                .violations
                .push(format!("Segment '{}' is not present in the reference data", segment)),
            Err(e) => {
                warn!(code, error = %e, "segment consistency check unavailable");
                report
                    .warnings
                    .push("Hierarchy consistency could not be verified".to_string());
            }
        }

        if let Some(ctx) = context {
            if let Some(industry) = ctx.industry.as_deref() {
                report.rules_checked += 1;
                let priority = &self.config.scoring.priority_segments;
                if industry.eq_ignore_ascii_case("construction")
                    && !priority.iter().any(|s| s == segment)
                {
                    report.recommendations.push(format!(
                        "Construction products usually classify under segments {}; \
                         review whether '{}' is intended",
                        priority.join("/"),
                        segment
                    ));
                }
            }
        }

        report.valid = report.violations.is_empty();
        self.record("validate_business_rules", started, None);
        Ok(report)
    }

    // ============ Knowledge graph ============

    /// Mirror a code and its relationships into the knowledge graph, then
    /// invalidate cached hierarchy/similarity views for that code.
    ///
    /// The graph write and the invalidation are not transactional; a crash
    /// in between leaves a stale (not corrupt) cache entry that expires
    /// via TTL. Returns `false` when the mirror is disabled or the write
    /// fails.
    pub async fn update_knowledge_graph_relationships(
        &self,
        code: &str,
        relationships: &[RelationshipSpec],
    ) -> Result<bool> {
        let started = Instant::now();
        if !hierarchy::validate_code_format(code) {
            self.record("validation_error", started, None);
            return Ok(false);
        }
        let Some(graph) = &self.graph else {
            debug!(code, "knowledge graph mirror disabled");
            self.record("update_knowledge_graph", started, None);
            return Ok(false);
        };

        // Enrich the node from the store when possible; the mirror still
        // gets a bare node if the reference row is missing.
        let (title, level) = match self.store.get_code(code).await {
            Ok(Some(record)) => (record.title, record.level),
            _ => (
                code.to_string(),
                hierarchy::level_of(code).map(|l| l.as_i32()).unwrap_or(4),
            ),
        };

        let result: Result<()> = async {
            graph.upsert_code_node(code, &title, level).await?;
            for rel in relationships {
                graph.upsert_relationship(code, rel).await?;
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(code, error = %e, "knowledge graph update failed");
            self.record("error", started, None);
            return Ok(false);
        }

        // Graph-derived views may have changed; direct code lookups have not.
        for pattern in [
            format!("{}*", cache::hierarchy_key(code)),
            format!("unspsc_similar:{}:*", code),
        ] {
            if let Err(e) = self.cache.delete_by_pattern(&pattern).await {
                warn!(%pattern, error = %e, "cache invalidation failed; entries will expire via TTL");
            }
        }

        self.record("update_knowledge_graph", started, None);
        Ok(true)
    }

    // ============ Classification writes ============

    /// Record or supersede a product's classification.
    ///
    /// Unlike the read paths this is loud: malformed input is an error,
    /// because silently dropping a write is worse than failing it.
    pub async fn record_classification(&self, record: &ProductClassification) -> Result<()> {
        let started = Instant::now();
        if record.product_id.trim().is_empty() {
            anyhow::bail!("product_id must not be empty");
        }
        if !(0.0..=1.0).contains(&record.confidence) {
            anyhow::bail!("confidence must be in [0, 1], got {}", record.confidence);
        }
        if record.unspsc_code.is_none() && record.etim_class.is_none() {
            anyhow::bail!("classification must reference an UNSPSC code or an ETIM class");
        }
        if let Some(code) = &record.unspsc_code {
            if !hierarchy::validate_code_format(code) {
                anyhow::bail!("invalid UNSPSC code '{}'", code);
            }
        }
        if let Some(class) = &record.etim_class {
            if !hierarchy::validate_etim_format(class) {
                anyhow::bail!("invalid ETIM class '{}'", class);
            }
        }

        self.store.upsert_classification(record).await?;
        self.record("record_classification", started, None);
        Ok(())
    }

    // ============ Telemetry ============

    /// Aggregate the bounded metric buffer. Not itself timed.
    pub fn get_performance_metrics(&self) -> MetricsSummary {
        self.metrics.lock().unwrap().summarize()
    }

    // ============ Internals ============

    /// Cache-aside fetch of one enriched code, shared by [`get_code`] and
    /// the hierarchy walk. Store faults propagate as `Err` so callers can
    /// tell an outage apart from a genuinely missing row; only the cache
    /// stays fail-soft here.
    ///
    /// [`get_code`]: ClassificationService::get_code
    async fn fetch_code(&self, code: &str) -> Result<Option<EnrichedCode>> {
        let key = cache::code_key(code);
        if let Some(mut hit) = self.cache_fetch::<EnrichedCode>(&key).await {
            hit.cache_hit = true;
            return Ok(Some(hit));
        }

        match self.store.get_code(code).await? {
            Some(record) => {
                let enriched = self.enrich(record).await;
                self.cache_store(&key, &enriched, self.config.cache.code_ttl_secs)
                    .await;
                Ok(Some(enriched))
            }
            None => Ok(None),
        }
    }

    async fn enrich(&self, record: UnspscCode) -> EnrichedCode {
        let segment_title = match record.segment.as_deref() {
            Some(segment) if record.level > 1 => {
                match self.store.segment_title(segment).await {
                    Ok(title) => title,
                    Err(e) => {
                        warn!(code = %record.code, error = %e, "segment title lookup failed");
                        None
                    }
                }
            }
            Some(_) => Some(record.title.clone()),
            None => None,
        };

        let structural_level = hierarchy::level_of(&record.code)
            .map(|l| l.as_i32())
            .unwrap_or(0);
        let hierarchy_valid =
            record.level == structural_level && record.level == record.level_from_fields();

        EnrichedCode {
            business_context: business_context(record.segment.as_deref()).to_string(),
            segment_title,
            hierarchy_valid,
            cache_hit: false,
            record,
        }
    }

    /// Cache read with fail-soft: outages and undecodable payloads are
    /// logged and treated as misses.
    async fn cache_fetch<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Cache write with fail-soft: the result has already been computed,
    /// so a failed write only costs the next caller a store round-trip.
    async fn cache_store<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache value");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw, ttl_secs).await {
            warn!(key, error = %e, "cache write failed");
        }
    }

    fn record(&self, operation: &str, started: Instant, cache_hit: Option<bool>) {
        let duration_ms = started.elapsed().as_millis() as u64;
        let metric = PerformanceMetric {
            operation: operation.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().timestamp(),
            within_sla: duration_ms <= self.config.service.performance_sla_ms,
            cache_hit,
        };
        self.metrics.lock().unwrap().push(metric);
    }
}

/// Coarse business-domain tag for a segment, attached to enriched records.
fn business_context(segment: Option<&str>) -> &'static str {
    match segment {
        Some("27") => "Tools and general machinery",
        Some("46") => "Safety, security and defense equipment",
        Some("30") => "Structures, building and construction materials",
        Some("31") => "Manufacturing components and supplies",
        Some("25") => "Commercial vehicles and transport",
        Some(_) => "General products and services",
        None => "Unclassified",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_context_mapping() {
        assert_eq!(business_context(Some("27")), "Tools and general machinery");
        assert_eq!(
            business_context(Some("99")),
            "General products and services"
        );
        assert_eq!(business_context(None), "Unclassified");
    }
}
