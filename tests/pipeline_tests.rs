// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use common::MockSession;
use std::sync::atomic::Ordering;
use strava_club_bot::config::Config;
use strava_club_bot::models::TimeWindow;
use strava_club_bot::services::RetrievalPipeline;
use strava_club_bot::store::CredentialStore;

const LEADERBOARD_HTML: &str = r#"<html><body><table class="dense">
    <tr><th>Rank</th><th>Athlete</th><th>Distance</th><th>Activities</th>
        <th>Longest</th><th>Avg Speed</th><th>Elev Gain</th></tr>
    <tr>
        <td>1</td>
        <td><a href="https://www.strava.com/athletes/1">
            <img src="https://cdn.example.com/1/medium.jpg">Ada</a></td>
        <td>105.3 km</td><td>4</td><td>60.0 km</td><td>27.1km/h</td><td>1,204 m</td>
    </tr>
</table></body></html>"#;

fn pipeline(dir: &tempfile::TempDir) -> RetrievalPipeline {
    let mut config = Config::test_default();
    config.cookies_dir = dir.path().to_path_buf();
    let store = CredentialStore::new(config.cookies_dir.clone());
    RetrievalPipeline::new(config, store)
}

#[tokio::test]
async fn successful_retrieval_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&dir);

    let mut session = MockSession::new();
    session.page_html = LEADERBOARD_HTML.to_string();
    let closed = session.closed.clone();

    let rows = pipeline
        .retrieve_with(session, 12345, TimeWindow::LastWeek)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Ada");
    assert_eq!(rows[0].distance.value, 105.3);
    assert!(closed.load(Ordering::SeqCst), "session must be released");
}

#[tokio::test]
async fn failed_login_still_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&dir);

    let mut session = MockSession::new();
    session.login_alert = true;
    let closed = session.closed.clone();

    let err = pipeline
        .retrieve_with(session, 12345, TimeWindow::LastWeek)
        .await
        .unwrap_err();

    assert!(err.is_authorization());
    assert!(closed.load(Ordering::SeqCst), "session must be released on failure");
}

#[tokio::test]
async fn malformed_leaderboard_page_still_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&dir);

    let mut session = MockSession::new();
    session.page_html = "<html><body>maintenance</body></html>".to_string();
    let closed = session.closed.clone();

    let err = pipeline
        .retrieve_with(session, 12345, TimeWindow::LastWeek)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        strava_club_bot::error::AppError::MalformedResponse(_)
    ));
    assert!(closed.load(Ordering::SeqCst));
}
