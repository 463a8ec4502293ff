//! The JSON document a pass prints: ranked entries with status, score,
//! card highlight and reminder quote, plus tallies and counters.

use chrono::NaiveDate;
use serde::Serialize;

use crate::billing::{expected_due_amount, reminder_kind, ReminderKind};
use crate::cache::CacheSnapshot;
use crate::highlight::{card_highlight, CardHighlight, ColorSettings};
use crate::metrics::MetricsSnapshot;
use crate::models::{HighlightRule, RiskStatus};
use crate::ranking::{LedgerView, RiskTally};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderQuote {
    pub kind: ReminderKind,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub license_plate: &'a str,
    pub score: f64,
    pub status: &'a RiskStatus,
    pub highlight: CardHighlight,
    /// Only for records not yet chased today.
    pub reminder: Option<ReminderQuote>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub reference_date: NaiveDate,
    pub highlight_rule: HighlightRule,
    pub entries: Vec<ReportEntry<'a>>,
    pub tally: RiskTally,
    pub metrics: Option<MetricsSnapshot>,
    pub cache: Option<CacheSnapshot>,
}

pub fn build_report<'a>(
    view: &'a LedgerView<'_>,
    reference_date: NaiveDate,
    rule: HighlightRule,
    colors: &ColorSettings,
    hide_remind_status: bool,
) -> Report<'a> {
    let entries = view
        .ranked
        .iter()
        .map(|entry| {
            let reminder = reminder_kind(&entry.status)
                .filter(|_| !entry.status.is_reminded)
                .map(|kind| ReminderQuote {
                    kind,
                    amount: expected_due_amount(entry.record, &entry.status),
                });

            ReportEntry {
                id: &entry.record.id,
                name: &entry.record.name,
                license_plate: &entry.record.license_plate,
                score: entry.score,
                status: &entry.status,
                highlight: card_highlight(&entry.status, colors, hide_remind_status),
                reminder,
            }
        })
        .collect();

    Report {
        reference_date,
        highlight_rule: rule,
        entries,
        tally: view.tally,
        metrics: None,
        cache: None,
    }
}
