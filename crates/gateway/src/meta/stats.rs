//! Per-backend outcome counters.
//!
//! The orchestrator records the outcome of every attempt it makes against a
//! backend. The counters are observational: routing never consults them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

/// Consecutive failures after which a backend is reported as degraded.
const DEGRADED_THRESHOLD: u32 = 3;

/// Outcome counters for a single backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendStats {
    /// Backend identifier.
    pub backend_id: String,

    /// Number of attempts routed to this backend.
    pub attempts: u64,

    /// Number of successful attempts.
    pub successes: u64,

    /// Number of failed attempts, raised or soft.
    pub failures: u64,

    /// Failures since the last success.
    pub consecutive_failures: u32,

    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,

    /// Time of the last success.
    pub last_success_at: Option<DateTime<Utc>>,

    /// Time of the last failure.
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl BackendStats {
    /// Creates empty counters for a backend.
    pub fn new(backend_id: impl Into<String>) -> Self {
        Self {
            backend_id: backend_id.into(),
            attempts: 0,
            successes: 0,
            failures: 0,
            consecutive_failures: 0,
            last_error: None,
            last_success_at: None,
            last_failure_at: None,
        }
    }

    /// Records a successful attempt.
    pub fn record_success(&mut self) {
        if self.is_degraded() {
            info!(backend_id = %self.backend_id, "Backend recovered");
        }
        self.attempts += 1;
        self.successes += 1;
        self.consecutive_failures = 0;
        self.last_error = None;
        self.last_success_at = Some(Utc::now());
    }

    /// Records a failed attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.attempts += 1;
        self.failures += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());
        self.last_failure_at = Some(Utc::now());

        if self.consecutive_failures == DEGRADED_THRESHOLD {
            warn!(
                backend_id = %self.backend_id,
                failures = self.consecutive_failures,
                "Backend degraded"
            );
        }
    }

    /// Returns true once the backend has failed several times in a row.
    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures >= DEGRADED_THRESHOLD
    }

    /// Share of successful attempts, or `None` before the first attempt.
    pub fn success_rate(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.successes as f64 / self.attempts as f64)
    }
}

/// Thread-safe registry of [`BackendStats`].
#[derive(Debug, Clone, Default)]
pub struct StatsRegistry {
    stats: Arc<RwLock<HashMap<String, BackendStats>>>,
}

impl StatsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a backend. Existing counters are kept.
    pub fn track(&self, backend_id: &str) {
        self.stats
            .write()
            .entry(backend_id.to_string())
            .or_insert_with(|| BackendStats::new(backend_id));
    }

    /// Records a successful attempt.
    pub fn record_success(&self, backend_id: &str) {
        self.stats
            .write()
            .entry(backend_id.to_string())
            .or_insert_with(|| BackendStats::new(backend_id))
            .record_success();
    }

    /// Records a failed attempt.
    pub fn record_failure(&self, backend_id: &str, error: impl Into<String>) {
        self.stats
            .write()
            .entry(backend_id.to_string())
            .or_insert_with(|| BackendStats::new(backend_id))
            .record_failure(error);
    }

    /// Returns a snapshot of one backend's counters.
    pub fn get(&self, backend_id: &str) -> Option<BackendStats> {
        self.stats.read().get(backend_id).cloned()
    }

    /// Returns a snapshot of every backend's counters.
    pub fn snapshot(&self) -> HashMap<String, BackendStats> {
        self.stats.read().clone()
    }

    /// Returns the identifiers of degraded backends.
    pub fn degraded(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .stats
            .read()
            .values()
            .filter(|stats| stats.is_degraded())
            .map(|stats| stats.backend_id.clone())
            .collect();
        ids.sort();
        ids
    }
}
