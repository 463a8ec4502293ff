// =============================================================================
// search.rs: FINDING THE DRIVER YOU ARE LOOKING FOR
// =============================================================================
//
// Three independent sieves applied before ranking:
//
// 1. Text search on name and license plate. Case-insensitive substring
//    match scanned with memchr's SIMD memmem, then pinyin full spelling
//    and initials for Chinese names and plates.
// 2. Minimum thresholds on arrears, violation cost and total debt.
// 3. A risk-tier toggle (severe / high / due today).
//
// The last two look at a computed `RiskStatus`, so they take one as input
// rather than computing their own and risking a different reference date.
// =============================================================================

use memchr::memmem;
use pinyin::ToPinyin;
use serde::{Deserialize, Serialize};

use crate::models::{DriverRecord, RiskLevel, RiskStatus};

/// Case-insensitive substring match on name or license plate, falling back
/// to pinyin: "zs", "zhangs" and "zhangsan" all find 张三.
/// An empty (or all-whitespace) term matches everything.
pub fn matches_search(term: &str, record: &DriverRecord) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    let finder = memmem::Finder::new(needle.as_bytes());
    let fields = [&record.name, &record.license_plate];
    if fields
        .iter()
        .any(|haystack| finder.find(haystack.to_lowercase().as_bytes()).is_some())
    {
        return true;
    }

    let spelled: String = needle.chars().filter(|c| !c.is_whitespace()).collect();
    fields.iter().any(|haystack| matches_pinyin(haystack, &spelled))
}

/// One unit per character: the toneless pinyin of a Han character, or the
/// lowercased character itself.
fn syllables(text: &str) -> Vec<String> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c.to_pinyin() {
            Some(pinyin) => pinyin.plain().to_string(),
            None => c.to_lowercase().collect(),
        })
        .collect()
}

/// True when `needle` spells a run of consecutive syllables of `text`, each
/// typed in full or cut short after at least its first letter.
fn matches_pinyin(text: &str, needle: &str) -> bool {
    let syllables = syllables(text);
    (0..syllables.len()).any(|start| spells(&syllables[start..], needle))
}

fn spells(syllables: &[String], needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let Some((head, rest)) = syllables.split_first() else {
        return false;
    };

    // Byte lengths of every prefix `head` and `needle` share, longest first.
    let shared: Vec<usize> = head
        .chars()
        .zip(needle.chars())
        .take_while(|(a, b)| a == b)
        .scan(0, |len, (c, _)| {
            *len += c.len_utf8();
            Some(*len)
        })
        .collect();

    shared.iter().rev().any(|&len| spells(rest, &needle[len..]))
}

/// Minimum amounts a record must reach to stay in view. `None` disables a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub min_arrears: Option<f64>,
    pub min_violation_cost: Option<f64>,
    pub min_total_debt: Option<f64>,
}

impl FilterConfig {
    pub fn is_active(&self) -> bool {
        self.min_arrears.is_some()
            || self.min_violation_cost.is_some()
            || self.min_total_debt.is_some()
    }

    pub fn passes(&self, status: &RiskStatus) -> bool {
        let meets = |threshold: Option<f64>, value: f64| threshold.map_or(true, |min| value >= min);

        meets(self.min_arrears, status.arrears_amount)
            && meets(self.min_violation_cost, status.violation_cost)
            && meets(self.min_total_debt, status.total_debt)
    }
}

/// Risk-tier toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskFilter {
    Severe,
    High,
    /// Due today, regardless of tier.
    Due,
}

impl RiskFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "severe" => Some(RiskFilter::Severe),
            "high" => Some(RiskFilter::High),
            "due" => Some(RiskFilter::Due),
            _ => None,
        }
    }

    pub fn passes(&self, status: &RiskStatus) -> bool {
        match self {
            RiskFilter::Severe => status.risk_level == RiskLevel::Severe,
            RiskFilter::High => status.risk_level == RiskLevel::High,
            RiskFilter::Due => status.is_due_day,
        }
    }
}
