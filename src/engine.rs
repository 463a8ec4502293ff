// =============================================================================
// engine.rs: ONE EVALUATION PASS
// =============================================================================
//
// Load the ledger, read the clock once, evaluate, log, render the report.
// File reads and the rayon fan-out both block, so async callers go through
// `run_blocking`, which hands the pass to tokio's blocking pool and keeps
// the runtime's worker threads free for the ticker and the Ctrl+C listener.
// =============================================================================

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::dates::{Clock, FixedClock, SystemClock};
use crate::ledger::Ledger;
use crate::metrics::EvaluationMetrics;
use crate::ranking::{Evaluator, ViewOptions};
use crate::report::build_report;

pub struct Engine {
    config: Config,
    clock: Box<dyn Clock>,
    evaluator: Evaluator,
    metrics: Arc<EvaluationMetrics>,
}

impl Engine {
    /// Wire up a clock, counters and a cached evaluator for `config`.
    /// A configured reference date pins the clock to that day.
    pub fn new(config: Config) -> Self {
        let clock: Box<dyn Clock> = match config.reference_date {
            Some(date) => {
                info!(%date, "📅 Replaying a fixed reference date");
                Box::new(FixedClock(date))
            }
            None => Box::new(SystemClock),
        };
        let metrics = Arc::new(EvaluationMetrics::new());
        let evaluator = Evaluator::new(config.highlight_rule, config.cache_size, metrics.clone());

        Self {
            config,
            clock,
            evaluator,
            metrics,
        }
    }

    /// Run one pass and return the pretty-printed JSON report.
    pub fn run_pass(&self) -> anyhow::Result<String> {
        let config = &self.config;
        let reference = self.clock.today();

        let ledger = Ledger::load(&config.ledger_path)
            .with_context(|| format!("loading ledger from {}", config.ledger_path.display()))?;

        let options = ViewOptions {
            search: config.search.clone(),
            thresholds: config.thresholds,
            risk_filter: config.risk_filter,
            hide_remind_weighting: config.hide_remind_status,
        };
        let view = self.evaluator.view(ledger.list(), reference, &options);

        for entry in &view.ranked {
            info!(
                id = %entry.record.id,
                plate = %entry.record.license_plate,
                level = %entry.status.risk_level,
                unpaid_rent = entry.status.unpaid_rent,
                total_debt = entry.status.total_debt,
                due = entry.status.is_due_day,
                reminded = entry.status.is_reminded,
                score = entry.score,
                "{}",
                entry.record.name
            );
        }

        info!(
            %reference,
            drivers = view.tally.total,
            severe = view.tally.severe,
            high = view.tally.high,
            due = view.tally.due,
            reminded = view.tally.reminded,
            "📊 Pass complete"
        );

        let mut report = build_report(
            &view,
            reference,
            self.evaluator.rule(),
            &config.colors,
            config.hide_remind_status,
        );
        report.metrics = Some(self.metrics.snapshot());
        report.cache = Some(self.evaluator.cache().snapshot());

        serde_json::to_string_pretty(&report).context("serializing report")
    }

    /// `run_pass` on tokio's blocking pool.
    pub async fn run_blocking(self: Arc<Self>) -> anyhow::Result<String> {
        tokio::task::spawn_blocking(move || self.run_pass())
            .await
            .context("evaluation pass panicked")?
    }
}
