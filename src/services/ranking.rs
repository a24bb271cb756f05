// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ranking and caching on top of the leaderboard fetcher.
//!
//! Each fetch costs a full authenticated session, so rankings are cached
//! per (club, metric, window) key with a TTL and a bounded entry count.
//! Concurrent requests for the same key are serialized through a per-key
//! lock with a double-checked cache read, so the on-demand command and the
//! scheduled publish never trigger duplicate logins.

use crate::error::AppError;
use crate::models::{LeaderboardRow, Metric, QueryKey, TimeWindow};
use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Source of raw leaderboard rows. The production implementation runs the
/// full authenticate-and-scrape pipeline; tests substitute a counting mock.
#[async_trait]
pub trait ClubFetcher: Send + Sync {
    async fn fetch_rows(
        &self,
        club_id: u64,
        window: TimeWindow,
    ) -> Result<Vec<LeaderboardRow>, AppError>;
}

/// Tuning knobs for the ranking cache.
#[derive(Debug, Clone)]
pub struct RankingOptions {
    pub ttl: Duration,
    pub capacity: usize,
    /// Whether the "longest ride" metric follows the requested week offset.
    /// When false it always reads the current week.
    pub longest_uses_window: bool,
}

struct CacheEntry {
    /// Full ranked row set (sorted, deduplicated); callers slice top-N.
    rows: Vec<LeaderboardRow>,
    expires_at: Instant,
    last_used: Instant,
}

/// Ranking service with a TTL + LRU bounded cache.
pub struct RankingService<F> {
    fetcher: F,
    options: RankingOptions,
    cache: DashMap<QueryKey, CacheEntry>,
    in_flight: DashMap<QueryKey, Arc<Mutex<()>>>,
}

impl<F: ClubFetcher> RankingService<F> {
    pub fn new(fetcher: F, options: RankingOptions) -> Self {
        Self {
            fetcher,
            options,
            cache: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Top `n` rows for a query key, sorted descending by the key's metric.
    ///
    /// Serves from cache when the entry is unexpired; otherwise fetches,
    /// ranks, stores and returns. Ties keep the source response order.
    pub async fn get_top(
        &self,
        key: QueryKey,
        n: usize,
    ) -> Result<Vec<LeaderboardRow>, AppError> {
        let key = self.effective_key(key);

        if let Some(rows) = self.cache_hit(&key) {
            tracing::debug!(key = %key, "ranking cache hit");
            return Ok(truncated(rows, n));
        }

        // Serialize fetch-and-populate per key. Whoever gets the lock first
        // does the fetch; waiters see the fresh entry on the re-check.
        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;
        let result = self.fetch_under_lock(&key).await;

        // The lock entry is only needed while a fetch is in flight; waiters
        // already hold their own Arc clone.
        drop(guard);
        self.in_flight.remove(&key);

        Ok(truncated(result?, n))
    }

    async fn fetch_under_lock(&self, key: &QueryKey) -> Result<Vec<LeaderboardRow>, AppError> {
        if let Some(rows) = self.cache_hit(key) {
            tracing::debug!(key = %key, "ranking cache hit after lock");
            return Ok(rows);
        }

        tracing::info!(key = %key, "ranking cache miss, fetching");
        let raw = self.fetcher.fetch_rows(key.club_id, key.window).await?;
        let ranked = rank_rows(raw, key.metric);

        self.insert(key.clone(), ranked.clone());
        Ok(ranked)
    }

    /// Number of live cache entries (expired ones included until evicted).
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of per-key fetch locks currently held.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    fn effective_key(&self, key: QueryKey) -> QueryKey {
        if key.metric == Metric::Longest && !self.options.longest_uses_window {
            QueryKey {
                window: TimeWindow::ThisWeek,
                ..key
            }
        } else {
            key
        }
    }

    fn cache_hit(&self, key: &QueryKey) -> Option<Vec<LeaderboardRow>> {
        let now = Instant::now();
        let mut entry = self.cache.get_mut(key)?;
        if entry.expires_at <= now {
            return None;
        }
        entry.last_used = now;
        Some(entry.rows.clone())
    }

    fn insert(&self, key: QueryKey, rows: Vec<LeaderboardRow>) {
        let now = Instant::now();
        self.cache.insert(
            key,
            CacheEntry {
                rows,
                expires_at: now + self.options.ttl,
                last_used: now,
            },
        );
        self.evict_to_capacity();
    }

    fn evict_to_capacity(&self) {
        while self.cache.len() > self.options.capacity {
            let oldest = self
                .cache
                .iter()
                .min_by_key(|entry| entry.value().last_used)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.cache.remove(&key);
                    tracing::debug!(key = %key, "evicted least recently used ranking");
                }
                None => break,
            }
        }
    }
}

/// Deduplicate by athlete and sort descending by the metric.
///
/// `sort_by` is stable, so rows with equal metric values keep the order
/// they appeared in the response.
fn rank_rows(rows: Vec<LeaderboardRow>, metric: Metric) -> Vec<LeaderboardRow> {
    let mut seen = HashSet::new();
    let mut rows: Vec<LeaderboardRow> = rows
        .into_iter()
        .filter(|row| seen.insert(row.profile_url.clone()))
        .collect();

    rows.sort_by(|a, b| {
        b.metric(metric)
            .value
            .partial_cmp(&a.metric(metric).value)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

fn truncated(mut rows: Vec<LeaderboardRow>, n: usize) -> Vec<LeaderboardRow> {
    rows.truncate(n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValue;

    fn sample_row(name: &str, distance: f64) -> LeaderboardRow {
        LeaderboardRow {
            rank: 0,
            name: name.to_string(),
            profile_url: format!("https://www.strava.com/athletes/{name}"),
            avatar_medium: String::new(),
            avatar_large: String::new(),
            distance: MetricValue {
                raw: format!("{distance} m"),
                value: distance,
            },
            activities: MetricValue::empty(),
            longest: MetricValue::empty(),
            avg_speed: MetricValue::empty(),
            elev_gain: MetricValue::empty(),
        }
    }

    #[test]
    fn rank_sorts_descending() {
        let rows = vec![
            sample_row("a", 10.0),
            sample_row("b", 30.0),
            sample_row("c", 20.0),
        ];
        let ranked = rank_rows(rows, Metric::Distance);
        let names: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b", "c", "a"]);
    }

    #[test]
    fn rank_is_stable_on_ties() {
        let rows = vec![
            sample_row("first", 10.0),
            sample_row("second", 10.0),
            sample_row("third", 10.0),
        ];
        let ranked = rank_rows(rows, Metric::Distance);
        let names: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn rank_deduplicates_by_athlete_keeping_first() {
        let mut duplicate = sample_row("a", 5.0);
        duplicate.name = "a-again".to_string();
        let rows = vec![sample_row("a", 10.0), duplicate, sample_row("b", 7.0)];
        let ranked = rank_rows(rows, Metric::Distance);
        let names: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
