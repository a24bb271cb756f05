// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava Club Bot: weekly club leaderboard standings over Telegram.
//!
//! Signs in to the Strava website with persisted session cookies (login
//! fallback when they are rejected), scrapes the club leaderboard, ranks
//! the top performers per metric behind a TTL cache, and publishes them to
//! a chat on demand and on a weekly schedule.

pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod store;

use config::Config;
use services::{RankingService, RetrievalPipeline, TelegramBot};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub ranking: RankingService<RetrievalPipeline>,
    pub bot: TelegramBot,
}
