// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Club leaderboard retrieval and table parsing.
//!
//! The leaderboard page renders one table with all metrics as columns:
//! rank, athlete, distance, activity count, longest ride, average speed,
//! elevation gain. Fetching is parameterized by club id and week offset;
//! the requested metric only matters later, at ranking time.

use crate::config::Selectors;
use crate::error::AppError;
use crate::models::{LeaderboardRow, MetricValue, TimeWindow};
use crate::services::session::SessionProvider;
use scraper::{ElementRef, Html, Selector};

/// Cells expected in each leaderboard row: rank, athlete, distance,
/// activities, longest, average speed, elevation gain.
const EXPECTED_CELLS: usize = 7;

/// Fetches and parses the club leaderboard over an authenticated session.
pub struct LeaderboardFetcher {
    base_url: String,
    table_selector: String,
}

impl LeaderboardFetcher {
    pub fn new(base_url: &str, selectors: &Selectors) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table_selector: selectors.leaderboard_table.clone(),
        }
    }

    /// URL of the leaderboard for a club and week offset.
    pub fn leaderboard_url(&self, club_id: u64, window: TimeWindow) -> String {
        match window.week_offset() {
            0 => format!("{}/clubs/{}/leaderboard", self.base_url, club_id),
            offset => format!(
                "{}/clubs/{}/leaderboard?week_offset={}",
                self.base_url, club_id, offset
            ),
        }
    }

    /// Navigate to the leaderboard and parse it into rows.
    ///
    /// Only rows actually present in the response are reported; an empty
    /// table is a valid outcome ("nobody rode this week"), never fabricated.
    pub async fn fetch<S: SessionProvider>(
        &self,
        session: &mut S,
        club_id: u64,
        window: TimeWindow,
    ) -> Result<Vec<LeaderboardRow>, AppError> {
        let url = self.leaderboard_url(club_id, window);
        tracing::info!(club_id, window = %window, url = %url, "fetching leaderboard");

        session.goto(&url).await?;
        let html = session.content().await?;
        let rows = parse_leaderboard(&html, &self.table_selector)?;

        tracing::info!(club_id, window = %window, athletes = rows.len(), "leaderboard parsed");
        Ok(rows)
    }
}

/// Parse a leaderboard document into rows.
///
/// Missing structure (no table, wrong cell count, no profile link) is a
/// malformed-response failure rather than a silently shorter ranking.
pub fn parse_leaderboard(html: &str, table_selector: &str) -> Result<Vec<LeaderboardRow>, AppError> {
    let table_sel = Selector::parse(table_selector).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("invalid table selector {table_selector}: {e}"))
    })?;
    let tr_sel = Selector::parse("tr").expect("static selector");

    let document = Html::parse_document(html);
    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| AppError::MalformedResponse("leaderboard table not found".to_string()))?;

    // First row is the header.
    table
        .select(&tr_sel)
        .skip(1)
        .map(parse_row)
        .collect::<Result<Vec<_>, _>>()
}

fn parse_row(row: ElementRef<'_>) -> Result<LeaderboardRow, AppError> {
    let td_sel = Selector::parse("td").expect("static selector");
    let a_sel = Selector::parse("a[href]").expect("static selector");
    let img_sel = Selector::parse("img[src]").expect("static selector");

    let cells: Vec<String> = row
        .select(&td_sel)
        .map(|td| td.text().collect::<String>().trim().to_string())
        .collect();
    if cells.len() != EXPECTED_CELLS {
        return Err(AppError::MalformedResponse(format!(
            "expected {EXPECTED_CELLS} leaderboard cells, found {}",
            cells.len()
        )));
    }

    let profile_url = row
        .select(&a_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .ok_or_else(|| {
            AppError::MalformedResponse("leaderboard row without athlete link".to_string())
        })?;

    let avatar_medium = row
        .select(&img_sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .ok_or_else(|| {
            AppError::MalformedResponse("leaderboard row without avatar image".to_string())
        })?;

    let rank = cells[0].parse::<u32>().map_err(|_| {
        AppError::MalformedResponse(format!("unparseable rank cell: {:?}", cells[0]))
    })?;

    Ok(LeaderboardRow {
        rank,
        name: cells[1].clone(),
        profile_url,
        avatar_large: upgrade_avatar(&avatar_medium),
        avatar_medium,
        distance: MetricValue::from_raw(&cells[2]),
        activities: MetricValue::from_raw(&cells[3]),
        longest: MetricValue::from_raw(&cells[4]),
        avg_speed: MetricValue::from_raw(&cells[5]),
        elev_gain: MetricValue::from_raw(&cells[6]),
    })
}

/// Upgrade an avatar URL from the medium to the large variant.
fn upgrade_avatar(url: &str) -> String {
    url.replace("medium", "large")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rank: u32, name: &str, distance: &str) -> String {
        format!(
            r#"<tr>
                <td>{rank}</td>
                <td><a href="https://www.strava.com/athletes/{rank}">
                    <img src="https://cdn.example.com/avatar/medium.jpg">{name}</a></td>
                <td>{distance}</td>
                <td>3</td>
                <td>40.1 km</td>
                <td>25.0km/h</td>
                <td>455 m</td>
            </tr>"#
        )
    }

    fn table(rows: &[String]) -> String {
        format!(
            r#"<html><body><table class="dense">
                <tr><th>Rank</th><th>Athlete</th><th>Distance</th><th>Activities</th>
                    <th>Longest</th><th>Avg Speed</th><th>Elev Gain</th></tr>
                {}
            </table></body></html>"#,
            rows.join("\n")
        )
    }

    #[test]
    fn parses_rows_in_order() {
        let html = table(&[row(1, "Ada", "105.3 km"), row(2, "Grace", "88.1 km")]);
        let rows = parse_leaderboard(&html, "table.dense").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Ada");
        assert_eq!(rows[0].distance.value, 105.3);
        assert_eq!(rows[1].profile_url, "https://www.strava.com/athletes/2");
    }

    #[test]
    fn avatar_upgraded_to_large() {
        let html = table(&[row(1, "Ada", "10 km")]);
        let rows = parse_leaderboard(&html, "table.dense").unwrap();
        assert_eq!(rows[0].avatar_medium, "https://cdn.example.com/avatar/medium.jpg");
        assert_eq!(rows[0].avatar_large, "https://cdn.example.com/avatar/large.jpg");
    }

    #[test]
    fn empty_table_is_empty_not_error() {
        let html = table(&[]);
        let rows = parse_leaderboard(&html, "table.dense").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_table_is_malformed() {
        let err = parse_leaderboard("<html><body></body></html>", "table.dense").unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[test]
    fn wrong_cell_count_is_malformed() {
        let html = r#"<table class="dense"><tr><th>h</th></tr>
            <tr><td>1</td><td>Ada</td></tr></table>"#;
        let err = parse_leaderboard(html, "table.dense").unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[test]
    fn placeholder_distance_normalizes_to_zero() {
        let html = table(&[row(1, "Ada", "--")]);
        let rows = parse_leaderboard(&html, "table.dense").unwrap();
        assert_eq!(rows[0].distance.value, 0.0);
        assert_eq!(rows[0].distance.raw, "--");
    }

    #[test]
    fn last_week_url_carries_offset() {
        let fetcher = LeaderboardFetcher::new("https://www.strava.com", &Default::default());
        assert_eq!(
            fetcher.leaderboard_url(12345, TimeWindow::LastWeek),
            "https://www.strava.com/clubs/12345/leaderboard?week_offset=1"
        );
        assert_eq!(
            fetcher.leaderboard_url(12345, TimeWindow::ThisWeek),
            "https://www.strava.com/clubs/12345/leaderboard"
        );
    }
}
