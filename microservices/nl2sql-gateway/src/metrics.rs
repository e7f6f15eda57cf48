//! Pipeline counters exposed at `/api/v1/metrics`

use serde::Serialize;
use tabula_telemetry::{Counter, Gauge, Histogram, HistogramSnapshot};

#[derive(Clone)]
pub struct PipelineMetrics {
    pub requests: Counter,
    pub cache_hits: Counter,
    pub generator_calls: Counter,
    pub fallbacks: Counter,
    pub security_rejections: Counter,
    pub execution_failures: Counter,
    pub generator_latency_ms: Histogram,
    pub catalog_tables: Gauge,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub cache_hits: u64,
    pub generator_calls: u64,
    pub fallbacks: u64,
    pub security_rejections: u64,
    pub execution_failures: u64,
    pub catalog_tables: u64,
    pub generator_latency_ms: HistogramSnapshot,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            requests: Counter::new("nl2sql_requests_total"),
            cache_hits: Counter::new("nl2sql_cache_hits_total"),
            generator_calls: Counter::new("nl2sql_generator_calls_total"),
            fallbacks: Counter::new("nl2sql_fallbacks_total"),
            security_rejections: Counter::new("nl2sql_security_rejections_total"),
            execution_failures: Counter::new("nl2sql_execution_failures_total"),
            generator_latency_ms: Histogram::with_capacity("nl2sql_generator_latency_ms", 1024),
            catalog_tables: Gauge::new("nl2sql_catalog_tables"),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.get(),
            cache_hits: self.cache_hits.get(),
            generator_calls: self.generator_calls.get(),
            fallbacks: self.fallbacks.get(),
            security_rejections: self.security_rejections.get(),
            execution_failures: self.execution_failures.get(),
            catalog_tables: self.catalog_tables.get(),
            generator_latency_ms: self.generator_latency_ms.snapshot(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
