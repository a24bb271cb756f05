// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated session handling against the Strava web login.
//!
//! The site offers no stable public API for club leaderboards, so the
//! pipeline signs in like a member would: try the cookies persisted from a
//! previous run first, fall back to submitting the login form when they are
//! absent or rejected.
//!
//! State machine:
//! `START → TRY_COOKIES → {AUTHENTICATED | NEED_LOGIN} → LOGIN_SUBMIT →
//! {AUTHENTICATED | LOGIN_FAILED}`
//!
//! Everything page-related goes through the narrow [`SessionProvider`]
//! capability so the same logic drives both the lightweight HTTP session and
//! the browser-driven variant (`browser` feature).

use crate::config::Selectors;
use crate::error::AppError;
use crate::store::{identity_key, CredentialStore, SessionCookie};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore as _, Jar};
use reqwest::Url;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;

/// A live session against the target site.
///
/// Exactly one credential bundle is bound to a session at a time; the
/// pipeline owns the session for the duration of one retrieval and closes
/// it on every exit path.
#[async_trait]
pub trait SessionProvider: Send {
    /// Navigate to a URL, waiting at most the session's page timeout.
    async fn goto(&mut self, url: &str) -> Result<(), AppError>;

    /// Reload the current page (used after installing cookies).
    async fn reload(&mut self) -> Result<(), AppError>;

    /// HTML of the current page.
    async fn content(&mut self) -> Result<String, AppError>;

    /// Install cookies into the live session.
    fn apply_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), AppError>;

    /// Snapshot the session's current cookies.
    fn session_cookies(&self) -> Vec<SessionCookie>;

    /// Fill and submit the login form with the given credentials.
    async fn submit_login(&mut self, email: &str, password: &str) -> Result<(), AppError>;

    /// Check whether a selector matches on the current page within a
    /// bounded wait. `Ok(false)` is a normal outcome, not an error.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, AppError>;

    /// Release the session.
    async fn close(&mut self);
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP session (reqwest + cookie jar)
// ─────────────────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Lightweight session: a reqwest client with a cookie jar. Login is a
/// CSRF-token form POST against the site's session endpoint.
pub struct HttpSession {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    current_url: Option<Url>,
    body: String,
}

impl HttpSession {
    pub fn new(base_url: &str, page_timeout: Duration) -> Result<Self, AppError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(page_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Network(format!("failed to build HTTP client: {e}")))?;
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid base URL {base_url}: {e}")))?;

        Ok(Self {
            http,
            jar,
            base_url,
            current_url: None,
            body: String::new(),
        })
    }

    fn record_response(&mut self, url: Url, body: String) {
        self.current_url = Some(url);
        self.body = body;
    }

    async fn get(&mut self, url: &str) -> Result<(), AppError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Network(format!("GET {url}: HTTP {status}")));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("reading body of {url}: {e}")))?;
        tracing::debug!(url = %final_url, bytes = body.len(), "page loaded");
        self.record_response(final_url, body);
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for HttpSession {
    async fn goto(&mut self, url: &str) -> Result<(), AppError> {
        self.get(url).await
    }

    async fn reload(&mut self) -> Result<(), AppError> {
        let url = self
            .current_url
            .clone()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("reload before first navigation")))?;
        self.get(url.as_str()).await
    }

    async fn content(&mut self) -> Result<String, AppError> {
        Ok(self.body.clone())
    }

    fn apply_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), AppError> {
        for cookie in cookies {
            let header = if cookie.domain.is_empty() {
                format!("{}={}; Path=/", cookie.name, cookie.value)
            } else {
                format!(
                    "{}={}; Domain={}; Path=/",
                    cookie.name, cookie.value, cookie.domain
                )
            };
            self.jar.add_cookie_str(&header, &self.base_url);
        }
        Ok(())
    }

    fn session_cookies(&self) -> Vec<SessionCookie> {
        let domain = self.base_url.host_str().unwrap_or_default().to_string();
        let Some(header) = self.jar.cookies(&self.base_url) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            return Vec::new();
        };
        header
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| SessionCookie {
                name: name.to_string(),
                value: value.to_string(),
                domain: domain.clone(),
            })
            .collect()
    }

    async fn submit_login(&mut self, email: &str, password: &str) -> Result<(), AppError> {
        // The login page embeds a per-session CSRF token the form POST must
        // echo back.
        let token = extract_csrf_token(&self.body).ok_or_else(|| {
            AppError::ElementTimeout("authenticity token not found on login page".to_string())
        })?;

        let url = format!("{}session", self.base_url);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("utf8", "\u{2713}"),
                ("authenticity_token", token.as_str()),
                ("email", email),
                ("password", password),
                ("remember_me", "on"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Network(format!("POST {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Network(format!("POST {url}: HTTP {status}")));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("reading login response: {e}")))?;
        tracing::debug!(url = %final_url, "login form submitted");
        self.record_response(final_url, body);
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<bool, AppError> {
        // HTTP responses are complete documents; the check resolves
        // immediately instead of polling.
        selector_matches(&self.body, selector)
    }

    async fn close(&mut self) {
        tracing::debug!("HTTP session closed");
    }
}

/// Check a selector against a complete HTML document.
pub fn selector_matches(html: &str, selector: &str) -> Result<bool, AppError> {
    let selector = Selector::parse(selector)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid selector {selector}: {e}")))?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).next().is_some())
}

/// Pull the CSRF token out of a login page.
fn extract_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let input = Selector::parse("input[name=\"authenticity_token\"]").ok()?;
    if let Some(value) = document
        .select(&input)
        .next()
        .and_then(|el| el.value().attr("value"))
    {
        return Some(value.to_string());
    }

    let meta = Selector::parse("meta[name=\"csrf-token\"]").ok()?;
    document
        .select(&meta)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
}

// ─────────────────────────────────────────────────────────────────────────────
// Authenticator
// ─────────────────────────────────────────────────────────────────────────────

/// Drives the cookie-first login state machine over a [`SessionProvider`].
pub struct Authenticator<'a> {
    store: &'a CredentialStore,
    selectors: &'a Selectors,
    base_url: &'a str,
    email: &'a str,
    password: &'a str,
    probe_timeout: Duration,
}

impl<'a> Authenticator<'a> {
    pub fn new(
        store: &'a CredentialStore,
        selectors: &'a Selectors,
        base_url: &'a str,
        email: &'a str,
        password: &'a str,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            store,
            selectors,
            base_url,
            email,
            password,
            probe_timeout,
        }
    }

    /// Establish a valid authenticated session.
    ///
    /// Tries persisted cookies first. The probe is absence-based: the
    /// logged-out marker only reliably *appears* when unauthenticated, so
    /// not seeing it within the probe window means the cookies were
    /// accepted. Rejected cookies are deleted before the login fallback so
    /// the next run does not retry them.
    pub async fn authenticate<S: SessionProvider>(&self, session: &mut S) -> Result<(), AppError> {
        let login_url = format!("{}/login", self.base_url);
        session.goto(&login_url).await?;

        let identity = identity_key(self.email);

        // A store read failure is not fatal: proceed login-only for this run.
        let bundle = match self.store.read(&identity) {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(error = %e, identity, "cookie read failed, proceeding to login");
                None
            }
        };

        match bundle {
            Some(cookies) if !cookies.is_empty() => {
                tracing::info!(state = "try_cookies", count = cookies.len(), identity);
                session.apply_cookies(&cookies)?;
                session.reload().await?;

                let logged_out = session
                    .wait_for(&self.selectors.logged_out_marker, self.probe_timeout)
                    .await?;
                if !logged_out {
                    tracing::info!(state = "authenticated", identity, "persisted cookies accepted");
                    return Ok(());
                }

                tracing::warn!(state = "need_login", identity, "persisted cookies rejected");
                self.store.remove(&identity)?;
            }
            Some(_) => {
                // An empty bundle on disk is as good as no bundle.
                tracing::warn!(state = "need_login", identity, "empty cookie bundle on disk");
                self.store.remove(&identity)?;
            }
            None => {
                tracing::info!(state = "need_login", identity, "no persisted cookies");
            }
        }

        self.login(session, &identity).await
    }

    async fn login<S: SessionProvider>(
        &self,
        session: &mut S,
        identity: &str,
    ) -> Result<(), AppError> {
        tracing::info!(state = "login_submit", identity);
        session.submit_login(self.email, self.password).await?;

        let alert = session
            .wait_for(&self.selectors.login_alert, self.probe_timeout)
            .await?;
        if alert {
            tracing::error!(state = "login_failed", identity);
            return Err(AppError::Authorization(
                "the username or password did not match".to_string(),
            ));
        }

        let cookies = session.session_cookies();
        if cookies.is_empty() {
            // A login that produced no cookies cannot be a real session;
            // never persist an empty bundle.
            tracing::error!(state = "login_failed", identity, "no session cookies after login");
            return Err(AppError::Authorization(
                "login produced no session cookies".to_string(),
            ));
        }

        // Persist before reporting success so the next run can skip login.
        // A persistence failure here surfaces as a store error.
        self.store.save(identity, &cookies)?;
        tracing::info!(state = "authenticated", identity, "login successful, cookies persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csrf_token_from_form_input() {
        let html = r#"<html><body><form>
            <input type="hidden" name="authenticity_token" value="tok123">
        </form></body></html>"#;
        assert_eq!(extract_csrf_token(html).as_deref(), Some("tok123"));
    }

    #[test]
    fn csrf_token_from_meta_fallback() {
        let html = r#"<html><head><meta name="csrf-token" content="meta456"></head></html>"#;
        assert_eq!(extract_csrf_token(html).as_deref(), Some("meta456"));
    }

    #[test]
    fn csrf_token_absent() {
        assert_eq!(extract_csrf_token("<html><body></body></html>"), None);
    }

    #[test]
    fn selector_presence_check() {
        let html = r#"<div class="btn-signup">Sign up</div>"#;
        assert!(selector_matches(html, ".btn-signup").unwrap());
        assert!(!selector_matches(html, ".alert-message").unwrap());
    }
}
