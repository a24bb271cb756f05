// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Metric and time-window types used to key leaderboard queries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One ranked dimension of the club leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Distance,
    ElevGain,
    Longest,
    AvgSpeed,
}

impl Metric {
    /// Stable identifier used in logs and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Distance => "distance",
            Metric::ElevGain => "elev_gain",
            Metric::Longest => "longest",
            Metric::AvgSpeed => "avg_speed",
        }
    }

    /// Human-readable name for message output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::Distance => "Distance",
            Metric::ElevGain => "Elevation Gain",
            Metric::Longest => "Longest Ride",
            Metric::AvgSpeed => "Average Speed",
        }
    }

    /// Metrics published in the weekly summary message.
    pub const PUBLISHED: [Metric; 3] = [Metric::Distance, Metric::ElevGain, Metric::Longest];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects the current vs. prior reporting week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    ThisWeek,
    LastWeek,
}

impl TimeWindow {
    /// Week-offset query parameter understood by the leaderboard endpoint.
    pub fn week_offset(&self) -> u8 {
        match self {
            TimeWindow::ThisWeek => 0,
            TimeWindow::LastWeek => 1,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindow::ThisWeek => f.write_str("this_week"),
            TimeWindow::LastWeek => f.write_str("last_week"),
        }
    }
}

/// Uniquely identifies one ranking request; used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub club_id: u64,
    pub metric: Metric,
    pub window: TimeWindow,
}

impl QueryKey {
    pub fn new(club_id: u64, metric: Metric, window: TimeWindow) -> Self {
        Self {
            club_id,
            metric,
            window,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.club_id, self.metric, self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_offset_values() {
        assert_eq!(TimeWindow::ThisWeek.week_offset(), 0);
        assert_eq!(TimeWindow::LastWeek.week_offset(), 1);
    }

    #[test]
    fn query_key_equality() {
        let a = QueryKey::new(12345, Metric::Distance, TimeWindow::LastWeek);
        let b = QueryKey::new(12345, Metric::Distance, TimeWindow::LastWeek);
        let c = QueryKey::new(12345, Metric::ElevGain, TimeWindow::LastWeek);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
