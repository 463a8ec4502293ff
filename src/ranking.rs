// =============================================================================
// ranking.rs: WHO GETS CALLED FIRST
// =============================================================================
//
// Batch evaluation of a whole ledger against ONE reference date, fanned out
// over rayon's work-stealing pool, then filtered, tallied and sorted by
// rank score.
//
// The reference date is taken as a parameter and never read from a clock in
// here: a batch that straddles midnight must not have half its records
// evaluated against tomorrow.
// =============================================================================

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::billing::{compute_status, rank_score};
use crate::cache::StatusCache;
use crate::dates::parse_calendar_date;
use crate::metrics::EvaluationMetrics;
use crate::models::{DriverRecord, HighlightRule, RiskLevel, RiskStatus};
use crate::search::{matches_search, FilterConfig, RiskFilter};

/// A record paired with its status for one reference date.
#[derive(Debug, Clone)]
pub struct Evaluated<'a> {
    pub record: &'a DriverRecord,
    pub status: RiskStatus,
}

#[derive(Debug, Clone)]
pub struct RankedRecord<'a> {
    pub record: &'a DriverRecord,
    pub status: RiskStatus,
    pub score: f64,
}

/// Headline counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskTally {
    pub total: usize,
    pub severe: usize,
    pub high: usize,
    pub due: usize,
    pub reminded: usize,
}

/// Compute every status in parallel against the same reference date.
pub fn evaluate_batch(
    records: &[DriverRecord],
    rule: HighlightRule,
    reference: NaiveDate,
) -> Vec<Evaluated<'_>> {
    records
        .par_iter()
        .map(|record| Evaluated {
            record,
            status: compute_status(record, rule, reference),
        })
        .collect()
}

/// Sort descending by rank score. Equal scores fall back to record id so
/// the order is total and repeatable.
pub fn rank(evaluated: Vec<Evaluated<'_>>, hide_remind_weighting: bool) -> Vec<RankedRecord<'_>> {
    let mut ranked: Vec<RankedRecord<'_>> = evaluated
        .into_iter()
        .map(|Evaluated { record, status }| {
            let score = rank_score(&status, hide_remind_weighting);
            RankedRecord {
                record,
                status,
                score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    ranked
}

pub fn tally(evaluated: &[Evaluated<'_>]) -> RiskTally {
    evaluated.iter().fold(RiskTally::default(), |mut tally, entry| {
        tally.total += 1;
        match entry.status.risk_level {
            RiskLevel::Severe => tally.severe += 1,
            RiskLevel::High => tally.high += 1,
            RiskLevel::Normal => {}
        }
        if entry.status.is_due_day {
            tally.due += 1;
        }
        if entry.status.is_reminded {
            tally.reminded += 1;
        }
        tally
    })
}

/// Knobs for building a ranked view of a ledger.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub search: String,
    pub thresholds: FilterConfig,
    pub risk_filter: Option<RiskFilter>,
    pub hide_remind_weighting: bool,
}

/// The ranked list plus the tier counts shown above it. The tally is taken
/// before the risk-tier toggle so the counts don't collapse when you click one.
#[derive(Debug, Clone)]
pub struct LedgerView<'a> {
    pub ranked: Vec<RankedRecord<'a>>,
    pub tally: RiskTally,
}

/// Cached, metered evaluation for long-running callers.
pub struct Evaluator {
    rule: HighlightRule,
    cache: StatusCache,
    metrics: Arc<EvaluationMetrics>,
}

impl Evaluator {
    pub fn new(rule: HighlightRule, cache_size: usize, metrics: Arc<EvaluationMetrics>) -> Self {
        Self {
            rule,
            cache: StatusCache::new(cache_size),
            metrics,
        }
    }

    pub fn rule(&self) -> HighlightRule {
        self.rule
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    pub fn evaluate<'a>(
        &self,
        records: &[&'a DriverRecord],
        reference: NaiveDate,
    ) -> Vec<Evaluated<'a>> {
        self.metrics.increment_passes();

        records
            .par_iter()
            .map(|&record| {
                if parse_calendar_date(&record.contract_start_date).is_none() {
                    self.metrics.increment_malformed_dates();
                }
                let status = self.cache.status(record, self.rule, reference);
                self.metrics.observe(&status);
                Evaluated { record, status }
            })
            .collect()
    }

    /// Search, evaluate, threshold-filter, tally, tier-filter, rank.
    pub fn view<'a>(
        &self,
        records: &'a [DriverRecord],
        reference: NaiveDate,
        options: &ViewOptions,
    ) -> LedgerView<'a> {
        let searched: Vec<&DriverRecord> = records
            .iter()
            .filter(|record| matches_search(&options.search, record))
            .collect();

        let base: Vec<Evaluated<'a>> = self
            .evaluate(&searched, reference)
            .into_iter()
            .filter(|entry| options.thresholds.passes(&entry.status))
            .collect();

        let tally = tally(&base);

        let shown: Vec<Evaluated<'a>> = match options.risk_filter {
            Some(filter) => base
                .into_iter()
                .filter(|entry| filter.passes(&entry.status))
                .collect(),
            None => base,
        };

        debug!(
            searched = searched.len(),
            shown = shown.len(),
            severe = tally.severe,
            high = tally.high,
            due = tally.due,
            "Ledger view built"
        );

        LedgerView {
            ranked: rank(shown, options.hide_remind_weighting),
            tally,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(id: &str, paid: f64, points: u32, reminded: Option<&str>) -> DriverRecord {
        DriverRecord {
            id: id.to_string(),
            name: format!("Driver {id}"),
            license_plate: format!("YUE-{id}"),
            contract_start_date: "2024-04-01".to_string(),
            total_payable: 3600.0,
            actual_paid: paid,
            violation_points: points,
            last_reminded_date: reminded.map(str::to_string),
            ..Default::default()
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn ids(ranked: &[RankedRecord<'_>]) -> Vec<String> {
        ranked.iter().map(|entry| entry.record.id.clone()).collect()
    }

    #[test]
    fn test_evaluate_batch_uses_one_reference_date() {
        let records = vec![driver("a", 0.0, 0, None), driver("b", 900.0, 0, None)];
        let evaluated = evaluate_batch(&records, HighlightRule::SmartTiered, day(7));
        assert_eq!(evaluated.len(), 2);
        assert!(evaluated.iter().all(|entry| entry.status.day_diff == 6));
        assert_eq!(evaluated[0].record.id, "a");
    }

    #[test]
    fn test_rank_orders_due_then_tiers_then_debt() {
        // Apr 7 is a due day for everybody, so use reminder stamps to
        // knock records out of the due tier.
        let records = vec![
            driver("normal", 900.0, 0, Some("2024-04-07")),
            driver("severe-small", 900.0, 7, Some("2024-04-07")),
            driver("due", 900.0, 0, None),
            driver("severe-big", 900.0, 12, Some("2024-04-07")),
            driver("high", 0.0, 0, Some("2024-04-07")),
        ];

        let ranked = rank(evaluate_batch(&records, HighlightRule::SmartTiered, day(7)), false);
        assert_eq!(ids(&ranked), vec!["due", "severe-big", "severe-small", "high", "normal"]);
    }

    #[test]
    fn test_hiding_reminder_weighting_ranks_by_tier_only() {
        let records = vec![
            driver("due", 900.0, 0, None),
            driver("high", 0.0, 0, Some("2024-04-07")),
        ];
        let ranked = rank(evaluate_batch(&records, HighlightRule::SmartTiered, day(7)), true);
        assert_eq!(ids(&ranked), vec!["high", "due"]);
    }

    #[test]
    fn test_ranking_is_repeatable_with_ties() {
        let records = vec![
            driver("c", 900.0, 0, None),
            driver("a", 900.0, 0, None),
            driver("b", 900.0, 0, None),
        ];
        let rule = HighlightRule::SmartTiered;
        let first = ids(&rank(evaluate_batch(&records, rule, day(10)), false));
        let second = ids(&rank(evaluate_batch(&records, rule, day(10)), false));
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_tally() {
        let records = vec![
            driver("severe", 0.0, 10, None),
            driver("high", 0.0, 0, Some("2024-04-07")),
            driver("normal", 900.0, 0, None),
        ];
        let evaluated = evaluate_batch(&records, HighlightRule::SmartTiered, day(7));
        assert_eq!(
            tally(&evaluated),
            RiskTally {
                total: 3,
                severe: 1,
                high: 1,
                due: 3,
                reminded: 1,
            }
        );
    }

    #[test]
    fn test_view_applies_search_thresholds_and_tier_toggle() {
        let metrics = Arc::new(EvaluationMetrics::new());
        let evaluator = Evaluator::new(HighlightRule::SmartTiered, 64, metrics.clone());
        let records = vec![
            driver("severe", 0.0, 10, None),
            driver("high", 0.0, 0, None),
            driver("normal", 3600.0, 0, None),
        ];

        let everything = evaluator.view(&records, day(10), &ViewOptions::default());
        assert_eq!(everything.ranked.len(), 3);
        assert_eq!(everything.tally.severe, 1);

        let options = ViewOptions {
            thresholds: FilterConfig {
                min_total_debt: Some(1.0),
                ..Default::default()
            },
            risk_filter: Some(RiskFilter::High),
            ..Default::default()
        };
        let view = evaluator.view(&records, day(10), &options);
        assert_eq!(ids(&view.ranked), vec!["high"]);
        // Tally ignores the tier toggle but honors thresholds.
        assert_eq!(view.tally.total, 2);
        assert_eq!(view.tally.severe, 1);

        let by_plate = ViewOptions {
            search: "yue-norm".to_string(),
            ..Default::default()
        };
        let searched = evaluator.view(&records, day(10), &by_plate);
        assert_eq!(ids(&searched.ranked), vec!["normal"]);

        let snap = metrics.snapshot();
        assert_eq!(snap.evaluation_passes, 3);
        assert_eq!(snap.records_evaluated, 7);
        assert!(evaluator.cache().snapshot().hits >= 4);
    }

    #[test]
    fn test_view_counts_malformed_dates() {
        let metrics = Arc::new(EvaluationMetrics::new());
        let evaluator = Evaluator::new(HighlightRule::SmartTiered, 8, metrics.clone());
        let mut broken = driver("broken", 0.0, 0, None);
        broken.contract_start_date = "??".to_string();
        let records = vec![broken];

        let view = evaluator.view(&records, day(10), &ViewOptions::default());
        assert_eq!(view.ranked[0].status.computed_bill_date, day(10));
        assert_eq!(metrics.snapshot().malformed_contract_dates, 1);
    }
}
