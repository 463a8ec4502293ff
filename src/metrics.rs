// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - what the evaluation passes have been seeing
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters, bumped from inside rayon workers without a lock in
// sight. Cumulative across passes; the report prints a snapshot.

use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use std::time::Instant;

use crate::billing::{reminder_kind, ReminderKind};
use crate::models::{RiskLevel, RiskStatus};

/// The metrics snapshot - what gets serialized into the report
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub evaluation_passes: u64,
    pub records_evaluated: u64,
    pub severe: u64,
    pub high: u64,
    pub normal: u64,
    pub due_today: u64,
    pub due_tomorrow: u64,
    pub reminded: u64,
    pub malformed_contract_dates: u64,
    pub uptime_seconds: u64,
    pub status: String,
}

pub struct EvaluationMetrics {
    evaluation_passes: AtomicU64,
    records_evaluated: AtomicU64,
    severe: AtomicU64,
    high: AtomicU64,
    normal: AtomicU64,
    due_today: AtomicU64,
    due_tomorrow: AtomicU64,
    reminded: AtomicU64,
    malformed_contract_dates: AtomicU64,
    start_time: Instant,
}

impl Default for EvaluationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationMetrics {
    pub fn new() -> Self {
        Self {
            evaluation_passes: AtomicU64::new(0),
            records_evaluated: AtomicU64::new(0),
            severe: AtomicU64::new(0),
            high: AtomicU64::new(0),
            normal: AtomicU64::new(0),
            due_today: AtomicU64::new(0),
            due_tomorrow: AtomicU64::new(0),
            reminded: AtomicU64::new(0),
            malformed_contract_dates: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_passes(&self) {
        self.evaluation_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed_dates(&self) {
        self.malformed_contract_dates.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one evaluated status.
    pub fn observe(&self, status: &RiskStatus) {
        self.records_evaluated.fetch_add(1, Ordering::Relaxed);

        let tier = match status.risk_level {
            RiskLevel::Severe => &self.severe,
            RiskLevel::High => &self.high,
            RiskLevel::Normal => &self.normal,
        };
        tier.fetch_add(1, Ordering::Relaxed);

        match reminder_kind(status) {
            Some(ReminderKind::DueToday) => {
                self.due_today.fetch_add(1, Ordering::Relaxed);
            }
            Some(ReminderKind::DueTomorrow) => {
                self.due_tomorrow.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }

        if status.is_reminded {
            self.reminded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a snapshot of all metrics (lock-free reads)
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            evaluation_passes: self.evaluation_passes.load(Ordering::Relaxed),
            records_evaluated: self.records_evaluated.load(Ordering::Relaxed),
            severe: self.severe.load(Ordering::Relaxed),
            high: self.high.load(Ordering::Relaxed),
            normal: self.normal.load(Ordering::Relaxed),
            due_today: self.due_today.load(Ordering::Relaxed),
            due_tomorrow: self.due_tomorrow.load(Ordering::Relaxed),
            reminded: self.reminded.load(Ordering::Relaxed),
            malformed_contract_dates: self.malformed_contract_dates.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            status: "operational".to_string(),
        }
    }
}
