// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard row types and the numeric normalization the ranking
//! layer depends on.

use crate::models::Metric;
use serde::{Deserialize, Serialize};

/// One leaderboard cell: the raw text as displayed by the site plus the
/// normalized numeric value used for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub raw: String,
    pub value: f64,
}

impl MetricValue {
    /// Normalize a raw leaderboard cell into a comparable number.
    ///
    /// The site renders values with unit suffixes, thousands separators and
    /// a `--` placeholder for "no data". The placeholder and anything that
    /// fails to parse normalize to zero rather than an error, so a single
    /// odd cell never takes down a whole ranking.
    ///
    /// Examples: `"1,234 m"` → 1234.0, `"32.2km/h"` → 32.2, `"--"` → 0.0.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            raw: trimmed.to_string(),
            value: normalize_numeric(trimmed),
        }
    }

    /// A zero value with the site's "no data" placeholder as display text.
    pub fn empty() -> Self {
        Self {
            raw: "--".to_string(),
            value: 0.0,
        }
    }
}

/// Extract a numeric value from leaderboard cell text.
fn normalize_numeric(text: &str) -> f64 {
    if text.is_empty() || text == "--" || text == "-" {
        return 0.0;
    }

    // Keep digits and separators; drops unit suffixes like " m" or "km/h".
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // Both present: the right-most separator is the decimal point.
        (Some(comma), Some(dot)) => {
            if dot > comma {
                cleaned.replace(',', "")
            } else {
                cleaned.replace('.', "").replace(',', ".")
            }
        }
        // Comma only: thousands grouping when every group after the first
        // has exactly three digits, otherwise a locale decimal comma.
        (Some(_), None) => {
            let mut groups = cleaned.split(',');
            let _first = groups.next();
            if groups.clone().count() > 0 && groups.all(|g| g.len() == 3) {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        _ => cleaned,
    };

    normalized.parse::<f64>().unwrap_or(0.0)
}

/// One participant's metrics for a time window, as scraped from the club
/// leaderboard table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// Position in the source table (1-based).
    pub rank: u32,
    pub name: String,
    /// Link to the athlete's profile page.
    pub profile_url: String,
    pub avatar_medium: String,
    /// Medium avatar upgraded to the large variant.
    pub avatar_large: String,
    pub distance: MetricValue,
    pub activities: MetricValue,
    pub longest: MetricValue,
    pub avg_speed: MetricValue,
    pub elev_gain: MetricValue,
}

impl LeaderboardRow {
    /// The cell for a given ranked metric.
    pub fn metric(&self, metric: Metric) -> &MetricValue {
        match metric {
            Metric::Distance => &self.distance,
            Metric::ElevGain => &self.elev_gain,
            Metric::Longest => &self.longest,
            Metric::AvgSpeed => &self.avg_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_normalizes_to_zero() {
        assert_eq!(MetricValue::from_raw("--").value, 0.0);
        assert_eq!(MetricValue::from_raw("").value, 0.0);
        assert_eq!(MetricValue::from_raw("   ").value, 0.0);
    }

    #[test]
    fn thousands_separator_and_unit_suffix() {
        assert_eq!(MetricValue::from_raw("1,234 m").value, 1234.0);
        assert_eq!(MetricValue::from_raw("10,000 m").value, 10000.0);
        assert_eq!(MetricValue::from_raw("1,234,567 m").value, 1234567.0);
    }

    #[test]
    fn decimal_values_with_units() {
        assert_eq!(MetricValue::from_raw("32.2km/h").value, 32.2);
        assert_eq!(MetricValue::from_raw("105.3 km").value, 105.3);
    }

    #[test]
    fn locale_decimal_comma() {
        assert_eq!(MetricValue::from_raw("32,2 km/h").value, 32.2);
        assert_eq!(MetricValue::from_raw("1.234,5 m").value, 1234.5);
    }

    #[test]
    fn unparseable_text_is_zero_not_error() {
        assert_eq!(MetricValue::from_raw("n/a").value, 0.0);
    }

    #[test]
    fn raw_text_is_preserved_for_display() {
        let v = MetricValue::from_raw(" 6,164 m ");
        assert_eq!(v.raw, "6,164 m");
        assert_eq!(v.value, 6164.0);
    }
}
