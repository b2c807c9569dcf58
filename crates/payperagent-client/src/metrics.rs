//! Per-request metrics kept in memory for the lifetime of a client.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

/// What happened to one call through the payment executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestMetrics {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    /// The gateway served the successful response from its cache.
    pub cached: bool,
    /// Signed retries sent.
    pub retries: u32,
    /// At least one 402 was received.
    pub payment_required: bool,
    pub succeeded: bool,
}

impl RequestMetrics {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            cached: false,
            retries: 0,
            payment_required: false,
            succeeded: false,
        }
    }

    pub fn finish(&mut self, elapsed: Duration, succeeded: bool) {
        self.finished_at = Some(Utc::now());
        self.duration_ms = Some(elapsed.as_millis() as u64);
        self.succeeded = succeeded;
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Metrics keyed by request id (`{endpoint}-{timestamp_ms}`).
///
/// Ids are unique: a collision gets a `-1`, `-2`, ... suffix.
#[derive(Debug, Default)]
pub struct MetricsStore {
    entries: DashMap<String, RequestMetrics>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `metrics` under a fresh id derived from `endpoint` and `timestamp_ms`.
    pub fn begin(&self, endpoint: &str, timestamp_ms: u64, metrics: RequestMetrics) -> String {
        let base = format!("{endpoint}-{timestamp_ms}");
        let mut id = base.clone();
        let mut suffix = 0u32;
        loop {
            match self.entries.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(metrics);
                    return id;
                }
                Entry::Occupied(_) => {
                    suffix += 1;
                    id = format!("{base}-{suffix}");
                }
            }
        }
    }

    /// Store the final state of a request.
    pub fn record(&self, id: &str, metrics: RequestMetrics) {
        self.entries.insert(id.to_string(), metrics);
    }

    pub fn get(&self, id: &str) -> Option<RequestMetrics> {
        self.entries.get(id).map(|m| m.value().clone())
    }

    /// Copy of every record.
    pub fn snapshot(&self) -> HashMap<String, RequestMetrics> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
