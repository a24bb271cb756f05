// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

#[cfg(feature = "browser")]
pub mod browser;
pub mod leaderboard;
pub mod pipeline;
pub mod ranking;
pub mod session;
pub mod telegram;

#[cfg(feature = "browser")]
pub use browser::BrowserSession;
pub use leaderboard::LeaderboardFetcher;
pub use pipeline::RetrievalPipeline;
pub use ranking::{ClubFetcher, RankingOptions, RankingService};
pub use session::{Authenticator, HttpSession, SessionProvider};
pub use telegram::TelegramBot;
