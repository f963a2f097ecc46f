use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use tracing::debug;

use crate::models::PosterLookup;

/// OMDb-style poster lookup by title.
pub struct PosterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl PosterClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, rps: u32) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no POSTER_API_KEY provided, every title gets the placeholder poster");
        }

        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self { client, api_key, base_url, limiter }
    }

    /// Never fails; errors come back as [`PosterLookup::Missing`] for the
    /// caller's policy to decide on.
    pub async fn lookup(&self, title: &str) -> PosterLookup {
        if self.api_key.trim().is_empty() {
            return PosterLookup::Missing("no poster API key configured".to_string());
        }

        self.limiter.until_ready().await;

        debug!(title = %title, "looking up poster");

        // The request URL carries the key, so it never reaches the error text.
        match self.fetch(title).await {
            Ok(resp) => resp.into_lookup(),
            Err(err) => PosterLookup::Missing(err.without_url().to_string()),
        }
    }

    async fn fetch(&self, title: &str) -> reqwest::Result<PosterResponse> {
        self.client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str()), ("t", title)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[derive(Debug, Deserialize)]
struct PosterResponse {
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

impl PosterResponse {
    fn into_lookup(self) -> PosterLookup {
        if self.response.as_deref() == Some("False") {
            return PosterLookup::Missing(self.error.unwrap_or_else(|| "not found".to_string()));
        }
        match self.poster.map(|p| p.trim().to_string()) {
            Some(p) if !p.is_empty() && p != "N/A" => PosterLookup::Found(p),
            _ => PosterLookup::Missing("no poster in response".to_string()),
        }
    }
}
