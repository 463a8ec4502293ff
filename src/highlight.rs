//! Card highlighting: which tone and accent color a record's card gets.
//!
//! Unchased due days beat risk tiers, because today's phone call matters
//! more than last month's fine. Reminded records, or all records when
//! reminder status is hidden, fall through to their risk tier.

use serde::{Deserialize, Serialize};

use crate::models::{RiskLevel, RiskStatus};

/// Hard-wired accent for "due today". Deliberately louder than any setting.
pub const DUE_TODAY_COLOR: &str = "#0000ff";
/// Accent for cards with nothing to flag.
pub const PLAIN_COLOR: &str = "#3b82f6";

/// User-configurable accent colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSettings {
    pub risk_color: String,
    pub due_color: String,
    pub severe_color: String,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            risk_color: "#ef4444".to_string(),
            due_color: "#f59e0b".to_string(),
            severe_color: "#7e22ce".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    DueToday,
    DueTomorrow,
    Severe,
    High,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardHighlight {
    pub tone: Tone,
    pub accent_color: String,
}

/// Pick the tone and accent for one card.
///
/// Due tomorrow takes `colors.due_color`, so the due color setting actually
/// repaints those cards. It defaults to the same amber (`#f59e0b`) they
/// always had. Due today stays pinned to `DUE_TODAY_COLOR`.
pub fn card_highlight(
    status: &RiskStatus,
    colors: &ColorSettings,
    hide_remind_status: bool,
) -> CardHighlight {
    let unchased = !hide_remind_status && !status.is_reminded;

    let (tone, accent) = if unchased && status.is_due_day {
        (Tone::DueToday, DUE_TODAY_COLOR)
    } else if unchased && status.is_pre_due_day {
        (Tone::DueTomorrow, colors.due_color.as_str())
    } else {
        match status.risk_level {
            RiskLevel::Severe => (Tone::Severe, colors.severe_color.as_str()),
            RiskLevel::High => (Tone::High, colors.risk_color.as_str()),
            RiskLevel::Normal => (Tone::Plain, PLAIN_COLOR),
        }
    };

    CardHighlight {
        tone,
        accent_color: accent.to_string(),
    }
}
