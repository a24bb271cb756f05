// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava Club Bot
//!
//! Publishes a club's weekly leaderboard top performers to Telegram,
//! on demand via /weektop and on a configurable weekly schedule.

use std::sync::Arc;
use strava_club_bot::{
    config::Config,
    scheduler,
    services::{telegram, RankingOptions, RankingService, RetrievalPipeline, TelegramBot},
    store::CredentialStore,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(club_id = config.club_id, "Starting Strava Club Bot");

    if config.use_browser && !cfg!(feature = "browser") {
        tracing::warn!(
            "USE_BROWSER is set but this build has no `browser` feature; using the HTTP session"
        );
    }

    // Credential store and retrieval pipeline
    let store = CredentialStore::new(config.cookies_dir.clone());
    let pipeline = RetrievalPipeline::new(config.clone(), store);

    // Ranking cache in front of the pipeline
    let ranking = RankingService::new(
        pipeline,
        RankingOptions {
            ttl: config.cache_ttl,
            capacity: config.cache_capacity,
            longest_uses_window: config.longest_uses_window,
        },
    );

    // Telegram connectivity check before entering the loops
    let bot = TelegramBot::new(config.bot_token.clone()).expect("Failed to build Telegram client");
    let bot_id = bot.get_me().await.expect("Telegram getMe failed");
    tracing::info!(bot_id, "Telegram bot connected");

    let state = Arc::new(AppState {
        config: config.clone(),
        ranking,
        bot,
    });

    if config.publish_enabled {
        tracing::info!(
            weekday = %config.publish_weekday,
            time = %config.publish_time,
            "scheduled publishing enabled"
        );
        tokio::spawn(scheduler::run_publish_loop(state.clone()));
    } else {
        tracing::info!("scheduled publishing disabled");
    }

    telegram::run_command_loop(state).await;
    Ok(())
}

/// Initialize structured logging with an env-filter.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava_club_bot=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
