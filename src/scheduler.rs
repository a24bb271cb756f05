// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled weekly publish.
//!
//! At most one background task: it sleeps until the configured weekday and
//! time-of-day (UTC), publishes the combined leaderboard to the configured
//! chat, and repeats. Retrieval goes through the same ranking service as
//! the on-demand command, so the per-key locks keep the two triggers from
//! fetching concurrently.

use crate::services::telegram;
use crate::AppState;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, Utc, Weekday};
use std::sync::Arc;

/// Next instant strictly after `after` that falls on `weekday` at `time`.
pub fn next_occurrence(after: DateTime<Utc>, weekday: Weekday, time: NaiveTime) -> DateTime<Utc> {
    for days_ahead in 0..=7 {
        let date = after.date_naive() + ChronoDuration::days(days_ahead);
        if date.weekday() != weekday {
            continue;
        }
        let candidate = date.and_time(time).and_utc();
        if candidate > after {
            return candidate;
        }
    }
    // Unreachable: a week always contains the weekday once.
    after + ChronoDuration::days(7)
}

/// Publish the weekly summary on schedule until the process exits.
pub async fn run_publish_loop(state: Arc<AppState>) {
    let weekday = state.config.publish_weekday;
    let time = state.config.publish_time;

    loop {
        let now = Utc::now();
        let next = next_occurrence(now, weekday, time);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next = %next, "next scheduled publish");
        tokio::time::sleep(wait).await;

        match telegram::build_week_top(&state).await {
            Ok(text) => match state.bot.send_message(state.config.chat_id, &text).await {
                Ok(message_id) => {
                    tracing::info!(message_id, "weekly leaderboard published");
                }
                Err(e) => tracing::error!(error = %e, "scheduled publish send failed"),
            },
            Err(e) => tracing::error!(error = %e, "scheduled publish retrieval failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn same_day_later_time() {
        // 2024-01-01 is a Monday.
        let after = utc(2024, 1, 1, 8, 0);
        let next = next_occurrence(after, Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(next, utc(2024, 1, 1, 9, 0));
    }

    #[test]
    fn same_day_earlier_time_rolls_a_week() {
        let after = utc(2024, 1, 1, 10, 0);
        let next = next_occurrence(after, Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(next, utc(2024, 1, 8, 9, 0));
    }

    #[test]
    fn exact_boundary_is_strictly_after() {
        let after = utc(2024, 1, 1, 9, 0);
        let next = next_occurrence(after, Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(next, utc(2024, 1, 8, 9, 0));
    }

    #[test]
    fn different_weekday_within_week() {
        let after = utc(2024, 1, 1, 10, 0);
        let next = next_occurrence(after, Weekday::Fri, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert_eq!(next, utc(2024, 1, 5, 18, 30));
    }
}
