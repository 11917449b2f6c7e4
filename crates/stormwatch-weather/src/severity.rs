//! Severity classification: decide whether a snapshot warrants an alert.
//!
//! Rules run in a fixed order (storm keywords, then wind, then
//! precipitation) and the first one that fires supplies the message, so the
//! same snapshot always yields the same decision.

use crate::types::WeatherSnapshot;
use serde::{Deserialize, Serialize};
use stormwatch_core::SeverityConfig;

pub const NOT_SEVERE_MESSAGE: &str = "No severe weather detected";

/// Which rule produced a severe decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SeverityRule {
    StormKeyword { keyword: String },
    HighWind { speed_mps: f64 },
    HeavyPrecipitation { amount_mm: f64 },
}

/// Outcome of classifying one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub is_severe: bool,
    pub message: String,
    pub rule: Option<SeverityRule>,
}

impl AlertDecision {
    fn not_severe() -> Self {
        Self {
            is_severe: false,
            message: NOT_SEVERE_MESSAGE.to_string(),
            rule: None,
        }
    }

    fn severe(rule: SeverityRule, message: String) -> Self {
        Self {
            is_severe: true,
            message,
            rule: Some(rule),
        }
    }
}

/// Classify `snapshot` against `policy`.
///
/// Unknown measurements are skipped rather than treated as failures.
pub fn classify(snapshot: &WeatherSnapshot, policy: &SeverityConfig) -> AlertDecision {
    if let Some(keyword) = matching_keyword(&snapshot.description, &policy.keywords) {
        let message = format!("Storm warning: {}", snapshot.description.trim());
        return AlertDecision::severe(SeverityRule::StormKeyword { keyword }, message);
    }

    if let Some(speed) = snapshot.wind_speed_mps.filter(|s| s.is_finite()) {
        if speed > policy.wind_speed_threshold_mps {
            let message = format!(
                "High wind warning: {:.1} m/s (threshold {:.1} m/s)",
                speed, policy.wind_speed_threshold_mps
            );
            return AlertDecision::severe(SeverityRule::HighWind { speed_mps: speed }, message);
        }
    }

    if let Some(amount) = snapshot.precipitation_mm.filter(|p| p.is_finite()) {
        if amount > policy.precipitation_threshold_mm {
            let message = format!(
                "Heavy precipitation warning: {:.1} mm in the last hour (threshold {:.1} mm)",
                amount, policy.precipitation_threshold_mm
            );
            return AlertDecision::severe(
                SeverityRule::HeavyPrecipitation { amount_mm: amount },
                message,
            );
        }
    }

    AlertDecision::not_severe()
}

/// First configured keyword contained in `description`, case-insensitively.
fn matching_keyword(description: &str, keywords: &[String]) -> Option<String> {
    let description = description.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .find(|k| !k.is_empty() && description.contains(k.as_str()))
}
