// =============================================================================
// cache.rs: THE STATUS MEMO
// =============================================================================
//
// Statuses are cheap to compute, but the card list, the tallies and the
// sort all ask for the same one several times per render. This memo keys
// on (record fingerprint, reference date, rule): a record that changed in
// any field has a new fingerprint, and a new day is a new key, so a cached
// status can never be stale. Old entries just age out of the LRU.
//
// Thread-safe behind a parking_lot Mutex so rayon workers can share it.
// =============================================================================

use chrono::NaiveDate;
use lru::LruCache;
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use tracing::info;

use crate::billing::compute_status;
use crate::models::{DriverRecord, HighlightRule, RiskStatus};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: u64,
    reference: NaiveDate,
    rule: HighlightRule,
}

pub struct StatusCache {
    // LruCache::get reorders, so even lookups need exclusive access.
    entries: Mutex<LruCache<CacheKey, RiskStatus>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl StatusCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        info!(capacity = capacity.get(), "Status cache initialized");

        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached `compute_status`.
    pub fn status(
        &self,
        record: &DriverRecord,
        rule: HighlightRule,
        reference: NaiveDate,
    ) -> RiskStatus {
        let key = CacheKey {
            fingerprint: fingerprint(record),
            reference,
            rule,
        };

        if let Some(status) = self.entries.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return status.clone();
        }

        // Computed outside the lock; two workers racing on the same key
        // produce identical statuses, so whichever lands last is fine.
        let status = compute_status(record, rule, reference);
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().put(key, status.clone());
        status
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().len(),
        }
    }
}

/// Hash of every field of the record. Floats hash by bit pattern.
pub fn fingerprint(record: &DriverRecord) -> u64 {
    let mut hasher = DefaultHasher::new();

    record.id.hash(&mut hasher);
    record.name.hash(&mut hasher);
    record.license_plate.hash(&mut hasher);
    record.contract_start_date.hash(&mut hasher);
    record.rent_duration.hash(&mut hasher);
    record.mode.hash(&mut hasher);
    record.violation_mode.hash(&mut hasher);
    for amount in [
        record.total_payable,
        record.actual_paid,
        record.overdue_rent_amount,
        record.violation_fine,
        record.history_violation_fine,
    ] {
        amount.to_bits().hash(&mut hasher);
    }
    record.violation_count.hash(&mut hasher);
    record.violation_points.hash(&mut hasher);
    record.violation_deadline.hash(&mut hasher);
    record.history_violation_count.hash(&mut hasher);
    record.history_violation_points.hash(&mut hasher);
    record.last_reminded_date.hash(&mut hasher);

    hasher.finish()
}
