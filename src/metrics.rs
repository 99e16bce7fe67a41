//! Pipeline metrics
//!
//! Thin wrappers over the `metrics` facade. Nothing here installs a recorder;
//! without one every call is a no-op, which keeps the library usable in tests
//! and embedded hosts alike.

use std::time::Instant;

pub const ROWS_READ: &str = "inbound_ingest_rows_read_total";
pub const ROWS_DROPPED: &str = "inbound_ingest_rows_dropped_total";
pub const OPTIONAL_SOURCE_ABSENT: &str = "inbound_ingest_optional_absent_total";
pub const PIPELINE_RUNS: &str = "inbound_pipeline_runs_total";
pub const PIPELINE_DURATION: &str = "inbound_pipeline_duration_seconds";
pub const CACHE_HITS: &str = "inbound_cache_hits_total";
pub const CACHE_MISSES: &str = "inbound_cache_misses_total";

/// Metrics for the CSV ingestion stage
pub struct IngestMetrics;

impl IngestMetrics {
    pub fn record_file(file: &'static str, rows_read: usize, rows_dropped: usize) {
        ::metrics::counter!(ROWS_READ, "file" => file).increment(rows_read as u64);
        if rows_dropped > 0 {
            ::metrics::counter!(ROWS_DROPPED, "file" => file).increment(rows_dropped as u64);
        }
    }

    pub fn record_optional_absent(file: &'static str) {
        ::metrics::counter!(OPTIONAL_SOURCE_ABSENT, "file" => file).increment(1);
    }
}

/// Metrics for the snapshot cache
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn record_hit() {
        ::metrics::counter!(CACHE_HITS).increment(1);
    }

    pub fn record_miss() {
        ::metrics::counter!(CACHE_MISSES).increment(1);
    }
}

/// A timing guard that records its elapsed time to a histogram when dropped
pub struct TimingGuard {
    start: Instant,
    histogram_name: &'static str,
}

impl TimingGuard {
    pub fn new(histogram_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            histogram_name,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        ::metrics::histogram!(self.histogram_name).record(self.elapsed_secs());
    }
}

/// Start timing a full pipeline run
pub fn time_pipeline() -> TimingGuard {
    ::metrics::counter!(PIPELINE_RUNS).increment(1);
    TimingGuard::new(PIPELINE_DURATION)
}
