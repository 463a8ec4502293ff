// =============================================================================
// models.rs: THE LEDGER'S DATA STRUCTURES
// =============================================================================
//
// One `DriverRecord` per lease contract, one `RiskStatus` computed from it
// every time somebody looks. The record is whatever the import or the sync
// collaborators managed to scrape together, so deserialization here is
// forgiving: numbers may arrive as strings, modes may be misspelled, nulls
// show up where zeros belong. Everything is normalized at this boundary so
// the engine only ever sees closed enums and plain numbers.
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Which billing tariff/account a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeaseMode {
    #[default]
    Kuaikuai,
    Kuaiwen,
}

impl LeaseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseMode::Kuaikuai => "kuaikuai",
            LeaseMode::Kuaiwen => "kuaiwen",
        }
    }
}

impl From<&str> for LeaseMode {
    /// Unknown modes fall back to `kuaikuai`, the account every ledger starts on.
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "kuaiwen" => LeaseMode::Kuaiwen,
            _ => LeaseMode::Kuaikuai,
        }
    }
}

impl From<String> for LeaseMode {
    fn from(raw: String) -> Self {
        LeaseMode::from(raw.as_str())
    }
}

impl From<LeaseMode> for String {
    fn from(mode: LeaseMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Risk tier. Ordered so that `Severe > High > Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Normal,
    High,
    Severe,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Normal => write!(f, "normal"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Severe => write!(f, "severe"),
        }
    }
}

/// How records get classified into risk tiers.
///
/// `SmartTiered` is the only rule anybody should be using. The other two
/// are single-threshold rules kept so that old saved settings still load
/// and still mean what they used to mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HighlightRule {
    /// severe: total debt >= 1300; high: stepped rent arrears >= one week of rent.
    #[default]
    SmartTiered,
    /// Deprecated. high: rent arrears including carry-over >= 1000.
    RentTotal1000,
    /// Deprecated. high: total debt >= 1200.
    Total1200,
}

impl HighlightRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightRule::SmartTiered => "smart_tiered",
            HighlightRule::RentTotal1000 => "rent_total_1000",
            HighlightRule::Total1200 => "total_1200",
        }
    }

    pub fn is_legacy(&self) -> bool {
        !matches!(self, HighlightRule::SmartTiered)
    }
}

impl From<&str> for HighlightRule {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "rent_total_1000" => HighlightRule::RentTotal1000,
            "total_1200" => HighlightRule::Total1200,
            _ => HighlightRule::SmartTiered,
        }
    }
}

impl From<String> for HighlightRule {
    fn from(raw: String) -> Self {
        HighlightRule::from(raw.as_str())
    }
}

impl From<HighlightRule> for String {
    fn from(rule: HighlightRule) -> Self {
        rule.as_str().to_string()
    }
}

impl fmt::Display for HighlightRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lease contract snapshot. Field names serialize in camelCase to match
/// the ledger files the import and sync collaborators produce.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub license_plate: String,

    /// Billing anchor. Kept raw: a malformed date is the engine's problem
    /// to recover from, not a reason to drop the whole record.
    #[serde(default)]
    pub contract_start_date: String,
    /// Informational month count.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub rent_duration: Option<String>,

    #[serde(default)]
    pub mode: LeaseMode,
    /// Violation-query account. `None` means "same as `mode`".
    #[serde(default)]
    pub violation_mode: Option<LeaseMode>,

    /// This cycle's full rent.
    #[serde(default, deserialize_with = "lenient::money")]
    pub total_payable: f64,
    /// Paid so far toward the current cycle.
    #[serde(default, deserialize_with = "lenient::money")]
    pub actual_paid: f64,
    /// Unpaid balance carried over from earlier cycles.
    #[serde(default, deserialize_with = "lenient::money")]
    pub overdue_rent_amount: f64,

    #[serde(default, deserialize_with = "lenient::count")]
    pub violation_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub violation_points: u32,
    #[serde(default, deserialize_with = "lenient::money")]
    pub violation_fine: f64,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub violation_deadline: Option<String>,

    // Historical violations are display-only. The engine never reads them.
    #[serde(default, deserialize_with = "lenient::count")]
    pub history_violation_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub history_violation_points: u32,
    #[serde(default, deserialize_with = "lenient::money")]
    pub history_violation_fine: f64,

    /// ISO date of the last reminder sent. Equal to "today" means already chased.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_reminded_date: Option<String>,
}

impl DriverRecord {
    pub fn effective_violation_mode(&self) -> LeaseMode {
        self.violation_mode.unwrap_or(self.mode)
    }
}

/// Derived snapshot of a record's debt and risk on one reference date.
/// Recomputed on every read and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskStatus {
    /// `YYYY/MM/DD-YYYY/MM/DD` window of the current billing cycle.
    pub period_range: String,
    /// Which of the four weekly installments we are in (1..=4).
    pub current_period: u8,
    /// Stepped rent arrears plus carry-over. Drives `high` and reminders.
    pub unpaid_rent: f64,
    /// Pro-rated settlement debt plus violations plus carry-over.
    /// Drives sorting, filtering and `severe`.
    pub total_debt: f64,
    pub arrears_amount: f64,
    pub real_time_arrears: f64,
    pub is_arrears: bool,
    pub violation_cost: f64,
    pub risk_level: RiskLevel,
    pub is_high_risk: bool,
    pub is_due_day: bool,
    pub is_pre_due_day: bool,
    pub is_reminded: bool,
    pub computed_bill_date: NaiveDate,
    pub cycle_end_date: NaiveDate,
    /// Stepped theoretical obligation as of today.
    pub expected_paid: f64,
    pub current_cycle_arrears: f64,
    pub weekly_rent: f64,
    pub rent_accrued_today: f64,
    pub day_diff: i64,
    pub total_days_in_cycle: i64,
}

/// Forgiving deserializers for fields that arrive from spreadsheets and
/// third-party APIs in whatever shape they feel like that day.
pub(crate) mod lenient {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberLike {
        Num(f64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextLike {
        Text(String),
        Num(f64),
    }

    /// Numbers, numeric strings and null. Junk becomes 0.
    pub fn money<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(match Option::<NumberLike>::deserialize(d)? {
            Some(NumberLike::Num(n)) => n,
            Some(NumberLike::Text(s)) => s.trim().parse().unwrap_or(0.0),
            None => 0.0,
        })
    }

    /// Same as `money`, then saturated into `u32` (negative and NaN become 0).
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let n = money(d)?;
        Ok(n.round() as u32)
    }

    /// Strings or numbers. Empty strings and null become `None`.
    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<TextLike>::deserialize(d)? {
            Some(TextLike::Text(s)) if s.trim().is_empty() => None,
            Some(TextLike::Text(s)) => Some(s),
            Some(TextLike::Num(n)) => Some(n.to_string()),
            None => None,
        })
    }
}
