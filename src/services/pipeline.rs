// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end retrieval pipeline: session construction, authentication,
//! leaderboard fetch, session release.
//!
//! This is the production [`ClubFetcher`] the ranking layer calls on a
//! cache miss. A fresh session is built per fetch and released on every
//! exit path, success or failure.

use crate::config::Config;
use crate::error::AppError;
use crate::models::{LeaderboardRow, TimeWindow};
use crate::services::leaderboard::LeaderboardFetcher;
use crate::services::ranking::ClubFetcher;
use crate::services::session::{Authenticator, HttpSession, SessionProvider};
use crate::store::CredentialStore;
use async_trait::async_trait;

pub struct RetrievalPipeline {
    config: Config,
    store: CredentialStore,
    fetcher: LeaderboardFetcher,
}

impl RetrievalPipeline {
    pub fn new(config: Config, store: CredentialStore) -> Self {
        let fetcher = LeaderboardFetcher::new(&config.base_url, &config.selectors);
        Self {
            config,
            store,
            fetcher,
        }
    }

    async fn run<S: SessionProvider>(
        &self,
        session: &mut S,
        club_id: u64,
        window: TimeWindow,
    ) -> Result<Vec<LeaderboardRow>, AppError> {
        let authenticator = Authenticator::new(
            &self.store,
            &self.config.selectors,
            &self.config.base_url,
            &self.config.email,
            &self.config.password,
            self.config.probe_timeout,
        );
        authenticator.authenticate(session).await?;
        self.fetcher.fetch(session, club_id, window).await
    }

    /// Run one retrieval over a caller-supplied session, releasing it on
    /// every exit path.
    pub async fn retrieve_with<S: SessionProvider>(
        &self,
        mut session: S,
        club_id: u64,
        window: TimeWindow,
    ) -> Result<Vec<LeaderboardRow>, AppError> {
        let result = self.run(&mut session, club_id, window).await;
        session.close().await;
        if let Err(e) = &result {
            tracing::error!(error = %e, club_id, "leaderboard retrieval failed");
        }
        result
    }
}

#[async_trait]
impl ClubFetcher for RetrievalPipeline {
    async fn fetch_rows(
        &self,
        club_id: u64,
        window: TimeWindow,
    ) -> Result<Vec<LeaderboardRow>, AppError> {
        #[cfg(feature = "browser")]
        if self.config.use_browser {
            let session = crate::services::browser::BrowserSession::new(
                self.config.selectors.clone(),
                self.config.page_timeout,
            )?;
            return self.retrieve_with(session, club_id, window).await;
        }

        let session = HttpSession::new(&self.config.base_url, self.config.page_timeout)?;
        self.retrieve_with(session, club_id, window).await
    }
}
