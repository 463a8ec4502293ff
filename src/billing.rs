// =============================================================================
// billing.rs: THE RENT CYCLE RECKONER
// =============================================================================
//
// Given a driver's contract, payments and violations, plus the date we are
// asking about, work out where they are in their billing cycle and how much
// trouble they are in.
//
// Two debt figures come out of here and they are NOT the same number:
//
// 1. Stepped rent arrears (`unpaid_rent`): one weekly installment becomes due
//    at each of four checkpoints. Reminders and the `high` tier key off this.
//
// 2. Settlement debt (`total_debt`): rent pro-rated per day, plus violation
//    costs, plus whatever was carried over. Sorting, filtering and the
//    `severe` tier key off this.
//
// Everything is a pure function of (record, rule, reference date). No clock
// reads, no I/O, no state. Garbage in produces zeros out, never a panic and
// never a NaN on somebody's screen.
// =============================================================================

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::dates::{clamped_date, parse_calendar_date, shift_month, slash_date};
use crate::models::{DriverRecord, HighlightRule, RiskLevel, RiskStatus};

/// Processing fee charged per demerit point. Business rule, not a setting.
pub const VIOLATION_POINT_FEE: f64 = 200.0;
/// Installments per billing cycle.
pub const INSTALLMENTS_PER_CYCLE: f64 = 4.0;
/// `smart_tiered`: total debt at or above this is `severe`.
pub const SEVERE_DEBT_THRESHOLD: f64 = 1300.0;
/// `rent_total_1000`: rent arrears at or above this is `high`.
pub const LEGACY_RENT_ARREARS_THRESHOLD: f64 = 1000.0;
/// `total_1200`: total debt at or above this is `high`.
pub const LEGACY_TOTAL_DEBT_THRESHOLD: f64 = 1200.0;

/// Zero-based day offsets of the first three checkpoints. The fourth sits on
/// the day before the cycle ends, whatever length the month has.
const WEEKLY_DUE_OFFSETS: [i64; 3] = [6, 13, 20];

// Rank score boosts. Each tier dwarfs any realistic debt amount below it.
pub const DUE_TODAY_BOOST: f64 = 1_000_000.0;
pub const DUE_TOMORROW_BOOST: f64 = 500_000.0;
pub const SEVERE_BOOST: f64 = 50_000.0;
pub const HIGH_BOOST: f64 = 10_000.0;

/// One rolling monthly billing window, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingCycle {
    pub anchor: NaiveDate,
    pub end: NaiveDate,
}

impl BillingCycle {
    /// Resolve the cycle containing `reference`. An unparseable contract
    /// date is recovered by anchoring on the reference date itself.
    pub fn resolve(contract_start: Option<NaiveDate>, reference: NaiveDate) -> Self {
        let (anchor, contract_day) = match contract_start {
            Some(start) => (compute_billing_anchor(start, reference), start.day()),
            None => (reference, reference.day()),
        };

        let (next_year, next_month) = shift_month(anchor.year(), anchor.month(), 1);
        let end = clamped_date(next_year, next_month, contract_day)
            .and_then(|next_anchor| next_anchor.pred_opt())
            .unwrap_or(anchor);

        Self { anchor, end }
    }

    /// Inclusive day count.
    pub fn total_days(&self) -> i64 {
        (self.end - self.anchor).num_days() + 1
    }

    pub fn due_offsets(&self) -> [i64; 4] {
        let [first, second, third] = WEEKLY_DUE_OFFSETS;
        [first, second, third, self.total_days() - 1]
    }

    pub fn period_range(&self) -> String {
        format!("{}-{}", slash_date(self.anchor), slash_date(self.end))
    }
}

/// The bill date floats with the contract's day-of-month.
///
/// If the reference date has reached the contract day this month, the anchor
/// is that day of this month; otherwise it is that day of last month. Days
/// 29-31 are clamped to the last day of shorter months, so a contract
/// signed on the 31st bills on Feb 28 (or 29) and on Apr 30.
pub fn compute_billing_anchor(contract_start: NaiveDate, reference: NaiveDate) -> NaiveDate {
    let contract_day = contract_start.day();

    if let Some(this_month) = clamped_date(reference.year(), reference.month(), contract_day) {
        if reference >= this_month {
            return this_month;
        }
    }

    let (year, month) = shift_month(reference.year(), reference.month(), -1);
    clamped_date(year, month, contract_day).unwrap_or(reference)
}

/// Money fields scrubbed of NaN, infinities and negatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amounts {
    pub total_payable: f64,
    pub actual_paid: f64,
    pub overdue_rent_amount: f64,
    pub violation_fine: f64,
}

impl Amounts {
    pub fn from_record(record: &DriverRecord) -> Self {
        Self {
            total_payable: non_negative(record.total_payable),
            actual_paid: non_negative(record.actual_paid),
            overdue_rent_amount: non_negative(record.overdue_rent_amount),
            violation_fine: non_negative(record.violation_fine),
        }
    }

    pub fn weekly_rent(&self) -> f64 {
        self.total_payable / INSTALLMENTS_PER_CYCLE
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Demerit points at the fixed fee, plus fines.
pub fn violation_cost(record: &DriverRecord) -> f64 {
    record.violation_points as f64 * VIOLATION_POINT_FEE + non_negative(record.violation_fine)
}

/// Compute the full risk snapshot of `record` as of `reference`.
pub fn compute_status(
    record: &DriverRecord,
    rule: HighlightRule,
    reference: NaiveDate,
) -> RiskStatus {
    let money = Amounts::from_record(record);

    let contract_start = parse_calendar_date(&record.contract_start_date);
    if contract_start.is_none() {
        debug!(
            record_id = %record.id,
            raw = %record.contract_start_date,
            "Unparseable contract start date, anchoring cycle on the reference date"
        );
    }

    let cycle = BillingCycle::resolve(contract_start, reference);
    let total_days_in_cycle = cycle.total_days();
    // The anchor never lies after the reference date; clamp anyway.
    let day_diff = (reference - cycle.anchor).num_days().max(0);
    let passed_days = day_diff + 1;

    let weekly_rent = money.weekly_rent();
    let violation_cost = violation_cost(record);

    let due_offsets = cycle.due_offsets();
    let is_due_day = due_offsets.contains(&day_diff);
    let is_pre_due_day = due_offsets.iter().any(|due| due - 1 == day_diff);

    let is_reminded = record
        .last_reminded_date
        .as_deref()
        .and_then(parse_calendar_date)
        .is_some_and(|reminded| reminded == reference);

    // Stepped: whole checkpoints passed, one installment each.
    let checkpoints_passed = due_offsets.iter().filter(|&&due| day_diff >= due).count();
    let expected_paid = weekly_rent * checkpoints_passed as f64;
    let unpaid_rent = (expected_paid - money.actual_paid).max(0.0) + money.overdue_rent_amount;

    // Smooth: pro-rated per day for the settlement figure.
    let rent_accrued_today = if total_days_in_cycle > 0 {
        money.total_payable / total_days_in_cycle as f64 * passed_days as f64
    } else {
        0.0
    };
    let current_settlement_debt = if money.actual_paid >= rent_accrued_today {
        violation_cost
    } else {
        rent_accrued_today - money.actual_paid + violation_cost
    };
    let total_debt = current_settlement_debt + money.overdue_rent_amount;

    let risk_level = classify(rule, total_debt, unpaid_rent, weekly_rent);
    let current_period = (day_diff / 7 + 1).min(4) as u8;

    RiskStatus {
        period_range: cycle.period_range(),
        current_period,
        unpaid_rent,
        total_debt,
        arrears_amount: total_debt,
        real_time_arrears: total_debt,
        is_arrears: total_debt > 0.0,
        violation_cost,
        risk_level,
        is_high_risk: risk_level >= RiskLevel::High,
        is_due_day,
        is_pre_due_day,
        is_reminded,
        computed_bill_date: cycle.anchor,
        cycle_end_date: cycle.end,
        expected_paid,
        current_cycle_arrears: unpaid_rent,
        weekly_rent,
        rent_accrued_today,
        day_diff,
        total_days_in_cycle,
    }
}

/// Tier assignment for a rule. Only `SmartTiered` ever says `severe`.
///
/// Under `SmartTiered`, `high` means the stepped arrears have reached one
/// weekly installment. A record with zero rent has no installment to fall
/// behind on, and read literally `0 >= 0` would flag every such record as
/// `high` even with nothing owed. So with zero rent the test becomes "owes
/// any rent at all", which only carry-over can make true.
pub fn classify(
    rule: HighlightRule,
    total_debt: f64,
    unpaid_rent: f64,
    weekly_rent: f64,
) -> RiskLevel {
    match rule {
        HighlightRule::SmartTiered => {
            let behind_a_week = if weekly_rent > 0.0 {
                unpaid_rent >= weekly_rent
            } else {
                unpaid_rent > 0.0
            };

            if total_debt >= SEVERE_DEBT_THRESHOLD {
                RiskLevel::Severe
            } else if behind_a_week {
                RiskLevel::High
            } else {
                RiskLevel::Normal
            }
        }
        HighlightRule::RentTotal1000 if unpaid_rent >= LEGACY_RENT_ARREARS_THRESHOLD => {
            RiskLevel::High
        }
        HighlightRule::Total1200 if total_debt >= LEGACY_TOTAL_DEBT_THRESHOLD => RiskLevel::High,
        HighlightRule::RentTotal1000 | HighlightRule::Total1200 => RiskLevel::Normal,
    }
}

/// Sort key, higher first.
///
/// Unreminded due-today, then unreminded due-tomorrow, then severe, then
/// high, each tier ordered by total debt. `hide_remind_weighting` drops the
/// due-day boosts and leaves tier and debt contributions alone.
pub fn rank_score(status: &RiskStatus, hide_remind_weighting: bool) -> f64 {
    let mut score = 0.0;

    if !hide_remind_weighting && !status.is_reminded {
        if status.is_due_day {
            score += DUE_TODAY_BOOST;
        }
        if status.is_pre_due_day {
            score += DUE_TOMORROW_BOOST;
        }
    }

    score += match status.risk_level {
        RiskLevel::Severe => SEVERE_BOOST,
        RiskLevel::High => HIGH_BOOST,
        RiskLevel::Normal => 0.0,
    };

    score + status.total_debt
}

/// Which reminder, if any, is due for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    DueToday,
    DueTomorrow,
}

pub fn reminder_kind(status: &RiskStatus) -> Option<ReminderKind> {
    if status.is_pre_due_day {
        Some(ReminderKind::DueTomorrow)
    } else if status.is_due_day {
        Some(ReminderKind::DueToday)
    } else {
        None
    }
}

/// Amount to quote in a payment reminder.
///
/// On a due day that is today's stepped arrears. On the day before, it is
/// tomorrow's: today's stepped obligation plus one more installment, less
/// what has been paid, plus carry-over. Quoting today's figure on the eve
/// of a checkpoint would come up one installment short.
pub fn expected_due_amount(record: &DriverRecord, status: &RiskStatus) -> f64 {
    if status.is_pre_due_day {
        let money = Amounts::from_record(record);
        let tomorrow_obligation = status.expected_paid + status.weekly_rent;
        (tomorrow_obligation - money.actual_paid).max(0.0) + money.overdue_rent_amount
    } else {
        status.unpaid_rent
    }
}
