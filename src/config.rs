//! Application configuration loaded from environment variables.
//!
//! Everything the pipeline needs is read once at startup into a `Config`
//! passed to the constructed services; there is no module-level state.

use chrono::{NaiveTime, Weekday};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// CSS selectors used to locate login fields and status markers on the
/// target site. These are environment-specific collaborator details, so
/// they are configuration with defaults rather than constants in code.
#[derive(Debug, Clone)]
pub struct Selectors {
    /// Appears only when the session is *not* authenticated. The cookie
    /// probe checks for its absence.
    pub logged_out_marker: String,
    /// Error banner shown after a rejected login.
    pub login_alert: String,
    pub email_field: String,
    pub password_field: String,
    pub login_button: String,
    /// The leaderboard table on the club page.
    pub leaderboard_table: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            logged_out_marker: ".btn-signup".to_string(),
            login_alert: ".alert-message".to_string(),
            email_field: "#email".to_string(),
            password_field: "#password".to_string(),
            login_button: "#login-button".to_string(),
            leaderboard_table: "table.dense".to_string(),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Target club & account ---
    /// Strava club whose leaderboard is published.
    pub club_id: u64,
    /// Account login email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Site base URL (overridable for testing against a local stub).
    pub base_url: String,

    // --- Session & persistence ---
    /// Directory holding one cookie file per account identity.
    pub cookies_dir: PathBuf,
    /// Maximum wait for any single page load.
    pub page_timeout: Duration,
    /// Bounded wait when probing for login/logged-out markers.
    pub probe_timeout: Duration,
    /// Drive a real browser for login instead of the HTTP session
    /// (requires the `browser` build feature).
    pub use_browser: bool,
    pub selectors: Selectors,

    // --- Ranking & cache ---
    /// How long a fetched ranking stays served from cache.
    pub cache_ttl: Duration,
    /// Maximum number of cached (club, metric, window) entries.
    pub cache_capacity: usize,
    /// Ranking slice size.
    pub top_n: usize,
    /// Whether the "longest ride" metric follows the requested week offset
    /// or always reads the current week. Source data is ambiguous here, so
    /// this is an explicit choice.
    pub longest_uses_window: bool,

    // --- Telegram delivery ---
    pub bot_token: String,
    /// Chat that receives the scheduled weekly publish.
    pub chat_id: i64,

    // --- Scheduled publishing ---
    pub publish_enabled: bool,
    pub publish_weekday: Weekday,
    /// Time of day (UTC) for the scheduled publish.
    pub publish_time: NaiveTime,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            club_id: require("CLUB_ID")?
                .parse()
                .map_err(|_| ConfigError::Invalid("CLUB_ID"))?,
            email: require("STRAVA_EMAIL")?,
            password: require("STRAVA_PASSWORD")?,
            base_url: env_or("BASE_URL", "https://www.strava.com"),

            cookies_dir: PathBuf::from(env_or("COOKIES_DIR", "cookies")),
            page_timeout: Duration::from_secs(parse_or("PAGE_TIMEOUT_SECS", 15)?),
            probe_timeout: Duration::from_secs(parse_or("PROBE_TIMEOUT_SECS", 3)?),
            use_browser: parse_or("USE_BROWSER", false)?,
            selectors: selectors_from_env(),

            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", 6 * 3600)?),
            cache_capacity: parse_or("CACHE_CAPACITY", 32)?,
            top_n: parse_or("TOP_N", 5)?,
            longest_uses_window: parse_or("LONGEST_USES_WINDOW", true)?,

            bot_token: require("TELEGRAM_BOT_TOKEN")?,
            chat_id: require("TELEGRAM_CHAT_ID")?
                .parse()
                .map_err(|_| ConfigError::Invalid("TELEGRAM_CHAT_ID"))?,

            publish_enabled: parse_or("PUBLISH_ENABLED", true)?,
            publish_weekday: env_or("PUBLISH_WEEKDAY", "Mon")
                .parse()
                .map_err(|_| ConfigError::Invalid("PUBLISH_WEEKDAY"))?,
            publish_time: NaiveTime::parse_from_str(&env_or("PUBLISH_TIME", "09:00"), "%H:%M")
                .map_err(|_| ConfigError::Invalid("PUBLISH_TIME"))?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            club_id: 12345,
            email: "rider@example.com".to_string(),
            password: "hunter2".to_string(),
            base_url: "https://www.strava.com".to_string(),
            cookies_dir: PathBuf::from("cookies"),
            page_timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(1),
            use_browser: false,
            selectors: Selectors::default(),
            cache_ttl: Duration::from_secs(3600),
            cache_capacity: 32,
            top_n: 5,
            longest_uses_window: true,
            bot_token: "test-token".to_string(),
            chat_id: 1,
            publish_enabled: false,
            publish_weekday: Weekday::Mon,
            publish_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn selectors_from_env() -> Selectors {
    let defaults = Selectors::default();
    Selectors {
        logged_out_marker: env_or("SELECTOR_LOGGED_OUT", &defaults.logged_out_marker),
        login_alert: env_or("SELECTOR_LOGIN_ALERT", &defaults.login_alert),
        email_field: env_or("SELECTOR_EMAIL", &defaults.email_field),
        password_field: env_or("SELECTOR_PASSWORD", &defaults.password_field),
        login_button: env_or("SELECTOR_LOGIN_BUTTON", &defaults.login_button),
        leaderboard_table: env_or("SELECTOR_LEADERBOARD_TABLE", &defaults.leaderboard_table),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
