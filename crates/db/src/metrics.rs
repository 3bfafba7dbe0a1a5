//! In-memory query performance metrics.
//!
//! Per-table aggregates plus bounded recent-slow-query and
//! recent-failure logs. Owned by the [`crate::optimizer::QueryOptimizer`];
//! not shared across processes.

use std::collections::HashMap;
use std::collections::VecDeque;

use serde::Serialize;

use dexhub_core::types::Timestamp;

#[derive(Debug, Default, Clone)]
struct TableStats {
    total_queries: u64,
    failed_queries: u64,
    total_duration_ms: u64,
    max_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlowQueryEntry {
    pub table: String,
    pub duration_ms: u64,
    pub attempts: u32,
    pub at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub table: String,
    pub error: String,
    pub attempts: u32,
    pub at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStatsSnapshot {
    pub table: String,
    pub total_queries: u64,
    pub failed_queries: u64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: u64,
}

/// Point-in-time view of the metrics store, served by the stats route.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tables: Vec<TableStatsSnapshot>,
    pub recent_slow_queries: Vec<SlowQueryEntry>,
    pub recent_failures: Vec<FailureEntry>,
}

#[derive(Debug)]
pub(crate) struct MetricsStore {
    per_table: HashMap<String, TableStats>,
    slow: VecDeque<SlowQueryEntry>,
    failures: VecDeque<FailureEntry>,
    capacity: usize,
}

impl MetricsStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            per_table: HashMap::new(),
            slow: VecDeque::new(),
            failures: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn record(&mut self, table: &str, duration_ms: u64, success: bool) {
        let stats = self.per_table.entry(table.to_string()).or_default();
        stats.total_queries += 1;
        if !success {
            stats.failed_queries += 1;
        }
        stats.total_duration_ms += duration_ms;
        stats.max_duration_ms = stats.max_duration_ms.max(duration_ms);
    }

    pub(crate) fn record_slow(&mut self, table: &str, duration_ms: u64, attempts: u32) {
        if self.slow.len() >= self.capacity {
            self.slow.pop_front();
        }
        self.slow.push_back(SlowQueryEntry {
            table: table.to_string(),
            duration_ms,
            attempts,
            at: chrono::Utc::now(),
        });
    }

    pub(crate) fn record_failure(&mut self, table: &str, error: String, attempts: u32) {
        if self.failures.len() >= self.capacity {
            self.failures.pop_front();
        }
        self.failures.push_back(FailureEntry {
            table: table.to_string(),
            error,
            attempts,
            at: chrono::Utc::now(),
        });
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let mut tables: Vec<TableStatsSnapshot> = self
            .per_table
            .iter()
            .map(|(table, s)| TableStatsSnapshot {
                table: table.clone(),
                total_queries: s.total_queries,
                failed_queries: s.failed_queries,
                avg_duration_ms: if s.total_queries == 0 {
                    0.0
                } else {
                    s.total_duration_ms as f64 / s.total_queries as f64
                },
                max_duration_ms: s.max_duration_ms,
            })
            .collect();
        tables.sort_by(|a, b| a.table.cmp(&b.table));

        MetricsSnapshot {
            tables,
            recent_slow_queries: self.slow.iter().cloned().collect(),
            recent_failures: self.failures.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_per_table() {
        let mut store = MetricsStore::new(10);
        store.record("moves", 100, true);
        store.record("moves", 300, false);
        store.record("items", 50, true);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.tables.len(), 2);

        let moves = snapshot.tables.iter().find(|t| t.table == "moves").unwrap();
        assert_eq!(moves.total_queries, 2);
        assert_eq!(moves.failed_queries, 1);
        assert_eq!(moves.avg_duration_ms, 200.0);
        assert_eq!(moves.max_duration_ms, 300);
    }

    #[test]
    fn slow_log_is_bounded() {
        let mut store = MetricsStore::new(2);
        store.record_slow("a", 2100, 1);
        store.record_slow("b", 2200, 1);
        store.record_slow("c", 2300, 1);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.recent_slow_queries.len(), 2);
        assert_eq!(snapshot.recent_slow_queries[0].table, "b");
        assert_eq!(snapshot.recent_slow_queries[1].table, "c");
    }

    #[test]
    fn failure_log_is_bounded() {
        let mut store = MetricsStore::new(1);
        store.record_failure("a", "boom".into(), 2);
        store.record_failure("b", "bang".into(), 1);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.recent_failures.len(), 1);
        assert_eq!(snapshot.recent_failures[0].table, "b");
    }
}
