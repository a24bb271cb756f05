// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Telegram delivery: thin Bot API client, message formatting and the
//! command loop.
//!
//! The formatter consumes ranked rows only; it never reaches into cache or
//! session internals.

use crate::error::AppError;
use crate::models::{LeaderboardRow, Metric, QueryKey, TimeWindow};
use crate::AppState;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";
const POLL_TIMEOUT_SECS: u64 = 25;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Thin Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramBot {
    http: reqwest::Client,
    token: String,
}

impl TelegramBot {
    pub fn new(token: String) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            // Long-poll timeout plus headroom.
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .map_err(|e| AppError::Telegram(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, token })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{}/{method}", self.token)
    }

    /// Identify the bot account; used as a startup connectivity check.
    pub async fn get_me(&self) -> Result<i64, AppError> {
        let resp: serde_json::Value = self
            .http
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| AppError::Telegram(format!("getMe: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Telegram(format!("getMe decode: {e}")))?;
        Ok(resp["result"]["id"].as_i64().unwrap_or(0))
    }

    /// Send an HTML-formatted message, returning its message id.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, AppError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Telegram(format!("sendMessage: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Telegram(format!("sendMessage HTTP {status}: {body}")));
        }

        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AppError::Telegram(format!("sendMessage decode: {e}")))?;
        Ok(resp_json["result"]["message_id"].as_i64().unwrap_or(0))
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TgUpdate>, AppError> {
        let url = format!(
            "{}?offset={offset}&timeout={POLL_TIMEOUT_SECS}\
             &allowed_updates=[\"message\",\"inline_query\"]",
            self.method_url("getUpdates")
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Telegram(format!("getUpdates: {e}")))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Telegram(format!("getUpdates HTTP {status}: {body}")));
        }

        let parsed: TgUpdatesResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::Telegram(format!("getUpdates decode: {e}: {}", body_snippet(&body)))
        })?;
        Ok(parsed.result)
    }

    /// Answer an inline query with a single article result.
    pub async fn answer_inline_query(&self, query_id: &str, text: &str) -> Result<(), AppError> {
        let body = serde_json::json!({
            "inline_query_id": query_id,
            "results": [inline_article(text)],
            "cache_time": 300,
        });
        let resp = self
            .http
            .post(self.method_url("answerInlineQuery"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Telegram(format!("answerInlineQuery: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Telegram(format!(
                "answerInlineQuery HTTP {status}: {body}"
            )));
        }
        Ok(())
    }
}

/// The weekly summary as an inline-mode article result.
fn inline_article(text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "article",
        "id": "weektop",
        "title": "Weekly Club Top",
        "description": "Top club members of the previous week",
        "input_message_content": {
            "message_text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        },
    })
}

/// Clamp a response body for log output without splitting a character.
fn body_snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[derive(Debug, Deserialize)]
struct TgUpdatesResponse {
    result: Vec<TgUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
    pub inline_query: Option<TgInlineQuery>,
}

#[derive(Debug, Deserialize)]
pub struct TgInlineQuery {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TgMessage {
    pub chat: TgChat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Message formatting
// ─────────────────────────────────────────────────────────────────────────────

const MEDALS: [&str; 5] = ["\u{1F947}", "\u{1F948}", "\u{1F949}", "4\u{FE0F}\u{20E3}", "5\u{FE0F}\u{20E3}"];

fn rank_emoji(position: usize) -> String {
    MEDALS
        .get(position)
        .map(|m| (*m).to_string())
        .unwrap_or_else(|| format!("{}.", position + 1))
}

/// Escape text for Telegram HTML parse mode. Quotes are escaped too so the
/// output is safe inside attribute values like `href`.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// One "Top N by <metric>" section.
pub fn format_top(rows: &[LeaderboardRow], metric: Metric) -> String {
    let mut out = format!("Top {} by {}:\n", rows.len(), metric.display_name());
    for (i, row) in rows.iter().enumerate() {
        let value = row.metric(metric);
        out.push_str(&format!(
            "{} <a href=\"{}\">{}</a>: {}\n",
            rank_emoji(i),
            html_escape(&row.profile_url),
            html_escape(&row.name),
            html_escape(&value.raw),
        ));
    }
    out
}

/// The combined weekly summary: one section per published metric plus a
/// link back to the club page.
pub fn format_combined(
    club_id: u64,
    base_url: &str,
    sections: &[(Metric, Vec<LeaderboardRow>)],
) -> String {
    let mut out = String::from("<b>Previous Week:</b>\n\n");
    for (metric, rows) in sections {
        out.push_str(&format_top(rows, *metric));
        out.push('\n');
    }
    out.push_str(&format!(
        "<a href=\"{}/clubs/{}\">Strava Club Link</a>",
        base_url.trim_end_matches('/'),
        club_id
    ));
    out
}

const WELCOME: &str = "Hello! I am the Strava Club Weekly Top Bot. \u{1F6B4}\u{200D}\u{2642}\u{FE0F}\u{1F3C5}\n\
Use /weektop to get the top club members of the week by distance, \
elevation gain, and longest ride. I also work in inline mode: mention me \
in any chat to share the weekly top.";

// ─────────────────────────────────────────────────────────────────────────────
// Command loop
// ─────────────────────────────────────────────────────────────────────────────

/// Retrieve all published metrics and build the combined weekly message.
pub async fn build_week_top(state: &AppState) -> Result<String, AppError> {
    let mut sections = Vec::with_capacity(Metric::PUBLISHED.len());
    for metric in Metric::PUBLISHED {
        let key = QueryKey::new(state.config.club_id, metric, TimeWindow::LastWeek);
        let rows = state.ranking.get_top(key, state.config.top_n).await?;
        sections.push((metric, rows));
    }
    Ok(format_combined(
        state.config.club_id,
        &state.config.base_url,
        &sections,
    ))
}

/// Poll for commands and answer them. Runs until the process exits.
pub async fn run_command_loop(state: Arc<AppState>) {
    let mut offset = 0i64;

    loop {
        let updates = match state.bot.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed, backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            if let Some(query) = update.inline_query {
                tracing::info!(query_id = %query.id, "handling inline query");
                match build_week_top(&state).await {
                    Ok(text) => {
                        if let Err(e) = state.bot.answer_inline_query(&query.id, &text).await {
                            tracing::warn!(error = %e, "failed to answer inline query");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "inline query retrieval failed");
                    }
                }
                continue;
            }

            let Some(message) = update.message else { continue };
            let Some(text) = message.text.as_deref() else { continue };
            let chat_id = message.chat.id;

            let command = text.split_whitespace().next().unwrap_or("");
            // Commands may arrive as /cmd@BotName in groups.
            match command.split('@').next().unwrap_or("") {
                "/start" | "/help" => {
                    if let Err(e) = state.bot.send_message(chat_id, WELCOME).await {
                        tracing::warn!(error = %e, chat_id, "failed to send welcome");
                    }
                }
                "/weektop" => {
                    tracing::info!(chat_id, "handling /weektop");
                    let reply = match build_week_top(&state).await {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, chat_id, "weektop retrieval failed");
                            "Couldn't fetch the leaderboard right now, please try again later."
                                .to_string()
                        }
                    };
                    if let Err(e) = state.bot.send_message(chat_id, &reply).await {
                        tracing::warn!(error = %e, chat_id, "failed to send weektop");
                    }
                }
                _ => {}
            }
        }
    }
}
