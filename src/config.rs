// =============================================================================
// config.rs: KNOBS
// =============================================================================
//
// Everything is read from the environment (or a .env file), prefixed with
// RENT_RISK_. Unset or unparseable values fall back to defaults; an unknown
// highlight rule falls back to `smart_tiered`. Nothing in here can stop the
// engine from starting.
// =============================================================================

use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::dates::parse_calendar_date;
use crate::highlight::ColorSettings;
use crate::models::HighlightRule;
use crate::search::{FilterConfig, RiskFilter};

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON array of driver records. Default: ledger.json
    pub ledger_path: PathBuf,

    /// Tier classification rule. Default: smart_tiered
    pub highlight_rule: HighlightRule,

    /// Drop the due-day boosts from ranking and highlighting.
    pub hide_remind_status: bool,

    /// Evaluate as of this date instead of today. For replaying a past day.
    pub reference_date: Option<NaiveDate>,

    /// Re-evaluate this often. Zero means evaluate once and exit.
    pub poll_interval: Duration,

    /// Entries in the status memo.
    pub cache_size: usize,

    pub colors: ColorSettings,

    pub thresholds: FilterConfig,

    pub risk_filter: Option<RiskFilter>,

    pub search: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("ledger.json"),
            highlight_rule: HighlightRule::SmartTiered,
            hide_remind_status: false,
            reference_date: None,
            poll_interval: Duration::ZERO,
            cache_size: 4096,
            colors: ColorSettings::default(),
            thresholds: FilterConfig::default(),
            risk_filter: None,
            search: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let reference_date = get("RENT_RISK_REFERENCE_DATE").and_then(|raw| {
            let parsed = parse_calendar_date(&raw);
            if parsed.is_none() {
                warn!(raw = %raw, "Ignoring unparseable RENT_RISK_REFERENCE_DATE, using today");
            }
            parsed
        });

        let risk_filter = get("RENT_RISK_RISK_FILTER").and_then(|raw| {
            let parsed = RiskFilter::parse(&raw);
            if parsed.is_none() {
                warn!(raw = %raw, "Ignoring unknown RENT_RISK_RISK_FILTER");
            }
            parsed
        });

        Config {
            ledger_path: get("RENT_RISK_LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ledger_path),
            highlight_rule: get("RENT_RISK_HIGHLIGHT_RULE")
                .map(HighlightRule::from)
                .unwrap_or(defaults.highlight_rule),
            hide_remind_status: get("RENT_RISK_HIDE_REMIND_STATUS")
                .and_then(|raw| parse_bool(&raw))
                .unwrap_or(defaults.hide_remind_status),
            reference_date,
            poll_interval: Duration::from_secs(
                get("RENT_RISK_POLL_SECS").and_then(|raw| raw.parse().ok()).unwrap_or(0),
            ),
            cache_size: get("RENT_RISK_CACHE_SIZE")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.cache_size),
            colors: ColorSettings {
                risk_color: get("RENT_RISK_RISK_COLOR").unwrap_or(defaults.colors.risk_color),
                due_color: get("RENT_RISK_DUE_COLOR").unwrap_or(defaults.colors.due_color),
                severe_color: get("RENT_RISK_SEVERE_COLOR")
                    .unwrap_or(defaults.colors.severe_color),
            },
            thresholds: FilterConfig {
                min_arrears: get("RENT_RISK_MIN_ARREARS").and_then(|raw| raw.parse().ok()),
                min_violation_cost: get("RENT_RISK_MIN_VIOLATION_COST")
                    .and_then(|raw| raw.parse().ok()),
                min_total_debt: get("RENT_RISK_MIN_TOTAL_DEBT").and_then(|raw| raw.parse().ok()),
            },
            risk_filter,
            search: get("RENT_RISK_SEARCH").unwrap_or_default(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.ledger_path, PathBuf::from("ledger.json"));
        assert_eq!(config.highlight_rule, HighlightRule::SmartTiered);
        assert!(!config.hide_remind_status);
        assert!(config.reference_date.is_none());
        assert_eq!(config.poll_interval, Duration::ZERO);
        assert_eq!(config.colors, ColorSettings::default());
        assert!(!config.thresholds.is_active());
        assert!(config.risk_filter.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("RENT_RISK_LEDGER_PATH", "/data/fleet.json"),
            ("RENT_RISK_HIGHLIGHT_RULE", "total_1200"),
            ("RENT_RISK_HIDE_REMIND_STATUS", "yes"),
            ("RENT_RISK_REFERENCE_DATE", "2024-04-23"),
            ("RENT_RISK_POLL_SECS", "300"),
            ("RENT_RISK_SEVERE_COLOR", "#000000"),
            ("RENT_RISK_MIN_TOTAL_DEBT", "1300"),
            ("RENT_RISK_RISK_FILTER", "due"),
            ("RENT_RISK_SEARCH", "zhang"),
        ]);
        assert_eq!(config.ledger_path, PathBuf::from("/data/fleet.json"));
        assert_eq!(config.highlight_rule, HighlightRule::Total1200);
        assert!(config.hide_remind_status);
        assert_eq!(config.reference_date, NaiveDate::from_ymd_opt(2024, 4, 23));
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.colors.severe_color, "#000000");
        assert_eq!(config.colors.risk_color, "#ef4444");
        assert_eq!(config.thresholds.min_total_debt, Some(1300.0));
        assert_eq!(config.risk_filter, Some(RiskFilter::Due));
        assert_eq!(config.search, "zhang");
    }

    #[test]
    fn test_junk_values_fall_back() {
        let config = config_from(&[
            ("RENT_RISK_HIGHLIGHT_RULE", "neon"),
            ("RENT_RISK_HIDE_REMIND_STATUS", "maybe"),
            ("RENT_RISK_REFERENCE_DATE", "yesterday-ish"),
            ("RENT_RISK_POLL_SECS", "-5"),
            ("RENT_RISK_MIN_ARREARS", "lots"),
            ("RENT_RISK_RISK_FILTER", "purple"),
            ("RENT_RISK_LEDGER_PATH", "   "),
        ]);
        assert_eq!(config.highlight_rule, HighlightRule::SmartTiered);
        assert!(!config.hide_remind_status);
        assert!(config.reference_date.is_none());
        assert_eq!(config.poll_interval, Duration::ZERO);
        assert!(config.thresholds.min_arrears.is_none());
        assert!(config.risk_filter.is_none());
        assert_eq!(config.ledger_path, PathBuf::from("ledger.json"));
    }
}
