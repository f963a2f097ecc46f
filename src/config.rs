use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

use crate::{classify, models::PosterPolicy};

/// Longest accepted classifier window: one day.
const MAX_WINDOW_MINUTES: i64 = 24 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub listings_base_url: String,
    pub cinema_id: String,
    pub device_os: String,
    pub browser_name: String,
    pub venue_name: String,
    pub poster_base_url: String,
    pub poster_api_key: String,
    pub poster_rps: u32,
    pub max_concurrent: usize,
    pub poster_policy: PosterPolicy,
    pub placeholder_poster_url: String,
    pub http_timeout: Duration,
    pub imminent_window_minutes: i64,
    pub retention_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let poster_policy = match std::env::var("POSTER_FAILURE_POLICY") {
            Ok(s) => s.parse().context("POSTER_FAILURE_POLICY")?,
            Err(_) => PosterPolicy::default(),
        };

        let imminent_window_minutes =
            window_minutes(std::env::var("IMMINENT_WINDOW_MINUTES").ok().as_deref())
                .context("IMMINENT_WINDOW_MINUTES")?;

        let http_timeout_secs: u64 =
            std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url: env_or("DATABASE_URL", "sqlite://cartelera.db?mode=rwc"),
            listings_base_url: env_or(
                "LISTINGS_BASE_URL",
                "https://funciones.cinecolombia.com/cineco",
            ),
            cinema_id: env_or("CINEMA_ID", "702"),
            device_os: env_or("DEVICE_OS", "Linux"),
            browser_name: env_or("BROWSER_NAME", "Chrome 128"),
            venue_name: env_or("VENUE_NAME", "Victoria"),
            poster_base_url: env_or("POSTER_BASE_URL", "http://www.omdbapi.com/"),
            poster_api_key: env_or("POSTER_API_KEY", ""),
            poster_rps: env_parse("POSTER_RPS", 4),
            max_concurrent: env_parse("MAX_CONCURRENT_REQUESTS", 4),
            poster_policy,
            placeholder_poster_url: env_or(
                "PLACEHOLDER_POSTER_URL",
                "https://via.placeholder.com/300x450?text=No+Poster",
            ),
            http_timeout: Duration::from_secs(http_timeout_secs.max(1)),
            imminent_window_minutes,
            retention_days: env_parse("RETENTION_DAYS", 30),
        })
    }

    pub fn imminent_window(&self) -> jiff::SignedDuration {
        let minutes = self.imminent_window_minutes.clamp(0, MAX_WINDOW_MINUTES);
        jiff::SignedDuration::from_mins(minutes)
    }
}

fn window_minutes(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(classify::DEFAULT_WINDOW.as_mins());
    };
    let minutes: i64 = raw.trim().parse()?;
    anyhow::ensure!(
        (0..=MAX_WINDOW_MINUTES).contains(&minutes),
        "{minutes} is outside 0..={MAX_WINDOW_MINUTES}"
    );
    Ok(minutes)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:0".parse().unwrap(),
            database_url: "sqlite::memory:".to_string(),
            listings_base_url: "http://127.0.0.1:1".to_string(),
            cinema_id: "702".to_string(),
            device_os: "Linux".to_string(),
            browser_name: "Chrome 128".to_string(),
            venue_name: "Victoria".to_string(),
            poster_base_url: "http://127.0.0.1:1/".to_string(),
            poster_api_key: "test-key".to_string(),
            poster_rps: 100,
            max_concurrent: 4,
            poster_policy: PosterPolicy::Placeholder,
            placeholder_poster_url: "https://via.placeholder.com/300x450?text=No+Poster"
                .to_string(),
            http_timeout: Duration::from_secs(2),
            imminent_window_minutes: 180,
            retention_days: 30,
        }
    }
}
