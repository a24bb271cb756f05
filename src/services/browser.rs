// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Browser-driven session variant (`browser` feature).
//!
//! Drives a headless Chrome through the same [`SessionProvider`] capability
//! as the HTTP session, for deployments where the plain form POST is not
//! enough (extra login challenges, bot checks). Chrome calls are blocking,
//! so each one runs on the blocking pool.

use crate::config::Selectors;
use crate::error::AppError;
use crate::services::session::SessionProvider;
use crate::store::SessionCookie;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

pub struct BrowserSession {
    // Kept alive for the lifetime of the session; dropping it closes Chrome.
    _browser: Browser,
    tab: Arc<Tab>,
    selectors: Selectors,
    page_timeout: Duration,
    current_url: Option<String>,
}

impl BrowserSession {
    pub fn new(selectors: Selectors, page_timeout: Duration) -> Result<Self, AppError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Chrome launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| AppError::Network(format!("failed to launch Chrome: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Network(format!("failed to open browser tab: {e}")))?;
        tab.set_default_timeout(page_timeout);

        tracing::info!("browser session started");
        Ok(Self {
            _browser: browser,
            tab,
            selectors,
            page_timeout,
            current_url: None,
        })
    }

    async fn navigate(&mut self, url: String) -> Result<(), AppError> {
        let tab = self.tab.clone();
        let nav_url = url.clone();
        task::spawn_blocking(move || -> Result<(), AppError> {
            tab.navigate_to(&nav_url)
                .map_err(|e| AppError::Network(format!("navigate {nav_url}: {e}")))?;
            tab.wait_until_navigated()
                .map_err(|e| AppError::ElementTimeout(format!("page load {nav_url}: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("browser task panicked: {e}")))??;

        self.current_url = Some(url);
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for BrowserSession {
    async fn goto(&mut self, url: &str) -> Result<(), AppError> {
        self.navigate(url.to_string()).await
    }

    async fn reload(&mut self) -> Result<(), AppError> {
        let url = self
            .current_url
            .clone()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("reload before first navigation")))?;
        self.navigate(url).await
    }

    async fn content(&mut self) -> Result<String, AppError> {
        let tab = self.tab.clone();
        task::spawn_blocking(move || {
            tab.get_content()
                .map_err(|e| AppError::Network(format!("failed to read page HTML: {e}")))
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("browser task panicked: {e}")))?
    }

    fn apply_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), AppError> {
        // CookieParam is a generated CDP type with many optional fields;
        // build it through serde to set only the ones we persist.
        let params = cookies
            .iter()
            .map(|c| {
                serde_json::from_value(serde_json::json!({
                    "name": c.name,
                    "value": c.value,
                    "domain": c.domain,
                    "path": "/",
                }))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("cookie param encoding: {e}")))?;

        self.tab
            .set_cookies(params)
            .map_err(|e| AppError::Network(format!("failed to set browser cookies: {e}")))
    }

    fn session_cookies(&self) -> Vec<SessionCookie> {
        match self.tab.get_cookies() {
            Ok(cookies) => cookies
                .into_iter()
                .map(|c| SessionCookie {
                    name: c.name,
                    value: c.value,
                    domain: c.domain,
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read browser cookies");
                Vec::new()
            }
        }
    }

    async fn submit_login(&mut self, email: &str, password: &str) -> Result<(), AppError> {
        let tab = self.tab.clone();
        let selectors = self.selectors.clone();
        let timeout = self.page_timeout;
        let email = email.to_string();
        let password = password.to_string();

        task::spawn_blocking(move || -> Result<(), AppError> {
            let field = |sel: &str| {
                tab.wait_for_element_with_custom_timeout(sel, timeout)
                    .map_err(|e| AppError::ElementTimeout(format!("{sel}: {e}")))
            };

            field(&selectors.email_field)?
                .click()
                .map_err(|e| AppError::Network(format!("click email field: {e}")))?;
            tab.type_str(&email)
                .map_err(|e| AppError::Network(format!("type email: {e}")))?;

            field(&selectors.password_field)?
                .click()
                .map_err(|e| AppError::Network(format!("click password field: {e}")))?;
            tab.type_str(&password)
                .map_err(|e| AppError::Network(format!("type password: {e}")))?;

            field(&selectors.login_button)?
                .click()
                .map_err(|e| AppError::Network(format!("click login button: {e}")))?;

            tab.wait_until_navigated()
                .map_err(|e| AppError::ElementTimeout(format!("post-login navigation: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("browser task panicked: {e}")))?
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, AppError> {
        let tab = self.tab.clone();
        let selector = selector.to_string();
        task::spawn_blocking(move || {
            Ok(tab
                .wait_for_element_with_custom_timeout(&selector, timeout)
                .is_ok())
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("browser task panicked: {e}")))?
    }

    async fn close(&mut self) {
        // Dropping the Browser handle tears Chrome down; nothing explicit
        // to flush here.
        tracing::info!("browser session closed");
    }
}
