//! Advisory performance telemetry.
//!
//! Every public service operation records one metric: its name, wall-clock
//! duration, whether it beat the configured SLA, and (for read paths)
//! whether the cache answered. The buffer is bounded at 1000 records with
//! oldest-first eviction; this is observability data, not an audit log.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

/// Maximum retained metric records; the oldest are evicted beyond this.
pub const METRICS_CAPACITY: usize = 1000;

/// One timed operation.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetric {
    pub operation: String,
    pub duration_ms: u64,
    /// Epoch seconds when the operation finished.
    pub timestamp: i64,
    pub within_sla: bool,
    /// `None` for operations where a cache is not consulted.
    pub cache_hit: Option<bool>,
}

/// Bounded append-only metric buffer.
#[derive(Debug, Default)]
pub struct MetricsBuffer {
    records: VecDeque<PerformanceMetric>,
}

impl MetricsBuffer {
    pub fn new() -> Self {
        Self {
            records: VecDeque::with_capacity(METRICS_CAPACITY),
        }
    }

    pub fn push(&mut self, metric: PerformanceMetric) {
        if self.records.len() == METRICS_CAPACITY {
            self.records.pop_front();
        }
        self.records.push_back(metric);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Aggregate the buffer into a summary for monitoring.
    pub fn summarize(&self) -> MetricsSummary {
        let total = self.records.len();
        if total == 0 {
            return MetricsSummary::default();
        }

        let cache_observations: Vec<bool> = self
            .records
            .iter()
            .filter_map(|m| m.cache_hit)
            .collect();
        let cache_hit_rate = if cache_observations.is_empty() {
            0.0
        } else {
            cache_observations.iter().filter(|&&h| h).count() as f64
                / cache_observations.len() as f64
        };

        let within = self.records.iter().filter(|m| m.within_sla).count();
        let sla_compliance = within as f64 / total as f64;

        let mut durations: Vec<u64> = self.records.iter().map(|m| m.duration_ms).collect();
        durations.sort_unstable();
        let p95_index = ((durations.len() as f64 * 0.95).ceil() as usize).saturating_sub(1);
        let p95_ms = durations[p95_index];

        let mut per_op: HashMap<String, (u64, u64)> = HashMap::new();
        for m in &self.records {
            let entry = per_op.entry(m.operation.clone()).or_insert((0, 0));
            entry.0 += m.duration_ms;
            entry.1 += 1;
        }
        let mut avg_latency_ms: Vec<OperationLatency> = per_op
            .into_iter()
            .map(|(operation, (sum, count))| OperationLatency {
                operation,
                avg_ms: sum as f64 / count as f64,
                count,
            })
            .collect();
        avg_latency_ms.sort_by(|a, b| a.operation.cmp(&b.operation));

        let efficiency = if cache_hit_rate > 0.8 {
            "excellent"
        } else if cache_hit_rate > 0.6 {
            "good"
        } else {
            "poor"
        };

        MetricsSummary {
            total_operations: total as u64,
            cache_hit_rate,
            sla_compliance,
            p95_ms,
            per_operation: avg_latency_ms,
            efficiency_rating: efficiency.to_string(),
        }
    }
}

/// Average latency for one operation type.
#[derive(Debug, Clone, Serialize)]
pub struct OperationLatency {
    pub operation: String,
    pub avg_ms: f64,
    pub count: u64,
}

/// Aggregated view of the metric buffer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSummary {
    pub total_operations: u64,
    /// Fraction of cache-consulting operations that hit.
    pub cache_hit_rate: f64,
    /// Fraction of all operations that finished within the SLA.
    pub sla_compliance: f64,
    pub p95_ms: u64,
    pub per_operation: Vec<OperationLatency>,
    /// `"excellent"` above 80% hit rate, `"good"` above 60%, else `"poor"`.
    pub efficiency_rating: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(op: &str, ms: u64, within: bool, hit: Option<bool>) -> PerformanceMetric {
        PerformanceMetric {
            operation: op.to_string(),
            duration_ms: ms,
            timestamp: 1_700_000_000,
            within_sla: within,
            cache_hit: hit,
        }
    }

    #[test]
    fn test_buffer_caps_at_capacity() {
        let mut buf = MetricsBuffer::new();
        for i in 0..(METRICS_CAPACITY + 50) {
            buf.push(metric("get_code", i as u64, true, Some(false)));
        }
        assert_eq!(buf.len(), METRICS_CAPACITY);
        // Oldest 50 evicted: the minimum surviving duration is 50.
        let summary = buf.summarize();
        assert_eq!(summary.total_operations, METRICS_CAPACITY as u64);
    }

    #[test]
    fn test_empty_summary() {
        let buf = MetricsBuffer::new();
        let summary = buf.summarize();
        assert_eq!(summary.total_operations, 0);
        assert_eq!(summary.cache_hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_ignores_non_cache_operations() {
        let mut buf = MetricsBuffer::new();
        buf.push(metric("get_code", 5, true, Some(true)));
        buf.push(metric("get_code", 5, true, Some(false)));
        buf.push(metric("validate_business_rules", 5, true, None));
        let summary = buf.summarize();
        assert!((summary.cache_hit_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sla_compliance_and_p95() {
        let mut buf = MetricsBuffer::new();
        for ms in [10, 10, 10, 10, 10, 10, 10, 10, 10, 900] {
            buf.push(metric("search", ms, ms <= 500, Some(false)));
        }
        let summary = buf.summarize();
        assert!((summary.sla_compliance - 0.9).abs() < 1e-9);
        assert_eq!(summary.p95_ms, 900);
    }

    #[test]
    fn test_efficiency_rating_bands() {
        let mut buf = MetricsBuffer::new();
        for _ in 0..9 {
            buf.push(metric("get_code", 5, true, Some(true)));
        }
        buf.push(metric("get_code", 5, true, Some(false)));
        assert_eq!(buf.summarize().efficiency_rating, "excellent");

        let mut buf = MetricsBuffer::new();
        for _ in 0..7 {
            buf.push(metric("get_code", 5, true, Some(true)));
        }
        for _ in 0..3 {
            buf.push(metric("get_code", 5, true, Some(false)));
        }
        assert_eq!(buf.summarize().efficiency_rating, "good");

        let mut buf = MetricsBuffer::new();
        buf.push(metric("get_code", 5, true, Some(false)));
        assert_eq!(buf.summarize().efficiency_rating, "poor");
    }

    #[test]
    fn test_per_operation_averages() {
        let mut buf = MetricsBuffer::new();
        buf.push(metric("get_code", 10, true, Some(true)));
        buf.push(metric("get_code", 30, true, Some(true)));
        buf.push(metric("search", 50, true, Some(false)));
        let summary = buf.summarize();
        let get_code = summary
            .per_operation
            .iter()
            .find(|o| o.operation == "get_code")
            .unwrap();
        assert!((get_code.avg_ms - 20.0).abs() < 1e-9);
        assert_eq!(get_code.count, 2);
    }
}
