// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test doubles: a fetch-counting `ClubFetcher` and a scripted
//! `SessionProvider`.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strava_club_bot::error::AppError;
use strava_club_bot::models::{LeaderboardRow, MetricValue, TimeWindow};
use strava_club_bot::services::{ClubFetcher, SessionProvider};
use strava_club_bot::store::SessionCookie;

/// Build a row whose metrics all come from raw cell text.
#[allow(dead_code)]
pub fn row(name: &str, distance: &str, longest: &str, elev_gain: &str) -> LeaderboardRow {
    LeaderboardRow {
        rank: 0,
        name: name.to_string(),
        profile_url: format!("https://www.strava.com/athletes/{name}"),
        avatar_medium: format!("https://cdn.example.com/{name}/medium.jpg"),
        avatar_large: format!("https://cdn.example.com/{name}/large.jpg"),
        distance: MetricValue::from_raw(distance),
        activities: MetricValue::from_raw("1"),
        longest: MetricValue::from_raw(longest),
        avg_speed: MetricValue::from_raw("25.0km/h"),
        elev_gain: MetricValue::from_raw(elev_gain),
    }
}

/// `ClubFetcher` that returns canned rows and counts invocations.
#[allow(dead_code)]
pub struct CountingFetcher {
    pub rows: Vec<LeaderboardRow>,
    pub calls: Arc<AtomicUsize>,
    /// Artificial latency per fetch, for concurrency tests.
    pub delay: Duration,
}

#[allow(dead_code)]
impl CountingFetcher {
    pub fn new(rows: Vec<LeaderboardRow>) -> Self {
        Self {
            rows,
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClubFetcher for CountingFetcher {
    async fn fetch_rows(
        &self,
        _club_id: u64,
        _window: TimeWindow,
    ) -> Result<Vec<LeaderboardRow>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.rows.clone())
    }
}

/// Scripted session: probe outcomes and login cookies are fixed up front,
/// method calls are recorded for assertions.
#[allow(dead_code)]
pub struct MockSession {
    /// Result of probing the logged-out marker after applying cookies.
    pub logged_out_probe: bool,
    /// Whether the login-failure alert shows after submitting the form.
    pub login_alert: bool,
    /// Cookies the session holds after a login submission.
    pub cookies_after_login: Vec<SessionCookie>,
    /// HTML served by `content()` (the leaderboard page).
    pub page_html: String,
    pub applied_cookies: Vec<SessionCookie>,
    pub calls: Vec<String>,
    pub closed: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockSession {
    pub fn new() -> Self {
        Self {
            logged_out_probe: false,
            login_alert: false,
            cookies_after_login: vec![SessionCookie {
                name: "_session".to_string(),
                value: "fresh".to_string(),
                domain: "www.strava.com".to_string(),
            }],
            page_html: String::new(),
            applied_cookies: Vec::new(),
            calls: Vec::new(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(name)).count()
    }
}

#[async_trait]
impl SessionProvider for MockSession {
    async fn goto(&mut self, url: &str) -> Result<(), AppError> {
        self.calls.push(format!("goto {url}"));
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), AppError> {
        self.calls.push("reload".to_string());
        Ok(())
    }

    async fn content(&mut self) -> Result<String, AppError> {
        self.calls.push("content".to_string());
        Ok(self.page_html.clone())
    }

    fn apply_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), AppError> {
        self.calls.push("apply_cookies".to_string());
        self.applied_cookies.extend_from_slice(cookies);
        Ok(())
    }

    fn session_cookies(&self) -> Vec<SessionCookie> {
        self.cookies_after_login.clone()
    }

    async fn submit_login(&mut self, email: &str, _password: &str) -> Result<(), AppError> {
        self.calls.push(format!("submit_login {email}"));
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<bool, AppError> {
        self.calls.push(format!("wait_for {selector}"));
        if selector.contains("btn-signup") {
            Ok(self.logged_out_probe)
        } else if selector.contains("alert-message") {
            Ok(self.login_alert)
        } else {
            Ok(false)
        }
    }

    async fn close(&mut self) {
        self.calls.push("close".to_string());
        self.closed.store(true, Ordering::SeqCst);
    }
}
