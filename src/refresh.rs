use std::sync::Arc;

use futures::{StreamExt, stream};
use jiff::{Span, civil::Date};
use tracing::{debug, info, warn};

use crate::{
    cache::ListingStore,
    clock,
    config::Config,
    error::RefreshError,
    listings::ListingsClient,
    models::{PosterLookup, PosterPolicy, Title},
    posters::PosterClient,
};

/// Cache-or-fetch for a day of listings.
pub struct Coordinator {
    config: Arc<Config>,
    store: ListingStore,
    listings: ListingsClient,
    posters: PosterClient,
}

impl Coordinator {
    pub fn new(config: Arc<Config>, http: reqwest::Client, store: ListingStore) -> Self {
        let listings = ListingsClient::new(http.clone(), &config);
        let posters = PosterClient::new(
            http,
            config.poster_api_key.clone(),
            config.poster_base_url.clone(),
            config.poster_rps,
        );
        Self { config, store, listings, posters }
    }

    pub async fn ensure_todays_listings(&self) -> Result<Vec<Title>, RefreshError> {
        self.ensure_listings_for(clock::today()).await
    }

    /// Serves `date` from the datastore when it already holds rows for it,
    /// otherwise refreshes from upstream. A failing existence check is an
    /// error, never a miss.
    pub async fn ensure_listings_for(&self, date: Date) -> Result<Vec<Title>, RefreshError> {
        if self.store.has_listings(date).await? {
            debug!(date = %date, "listings cache hit");
            return Ok(self.store.listings_for(date).await?);
        }

        debug!(date = %date, "listings cache miss");
        self.refresh(date).await
    }

    /// Fetches, enriches and persists `date`, then returns what the datastore
    /// holds so both paths hand out identical representations.
    pub async fn refresh(&self, date: Date) -> Result<Vec<Title>, RefreshError> {
        let mut titles = self.listings.fetch(date).await?;
        self.attach_posters(&mut titles).await?;

        self.store.put_listings(date, &titles).await?;
        self.prune(date).await;

        let stored = self.store.listings_for(date).await?;
        info!(date = %date, titles = stored.len(), "listings refreshed");
        Ok(stored)
    }

    async fn attach_posters(&self, titles: &mut [Title]) -> Result<(), RefreshError> {
        let names: Vec<String> = titles.iter().map(|t| t.name.clone()).collect();
        let lookups: Vec<PosterLookup> = stream::iter(names)
            .map(|name| async move { self.posters.lookup(&name).await })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        for (title, lookup) in titles.iter_mut().zip(lookups) {
            title.poster = resolve_poster(
                self.config.poster_policy,
                &self.config.placeholder_poster_url,
                &title.name,
                lookup,
            )?;
        }
        Ok(())
    }

    async fn prune(&self, today: Date) {
        if self.config.retention_days <= 0 {
            return;
        }
        let Ok(cutoff) = Span::new()
            .try_days(self.config.retention_days)
            .and_then(|span| today.checked_sub(span))
        else {
            return;
        };
        match self.store.prune_before(cutoff).await {
            Ok(0) => {},
            Ok(removed) => debug!(cutoff = %cutoff, removed = removed, "pruned old listings"),
            Err(err) => warn!(cutoff = %cutoff, error = %err, "failed to prune old listings"),
        }
    }
}

fn resolve_poster(
    policy: PosterPolicy,
    placeholder: &str,
    title: &str,
    lookup: PosterLookup,
) -> Result<String, RefreshError> {
    match (lookup, policy) {
        (PosterLookup::Found(url), _) => Ok(url),
        (PosterLookup::Missing(reason), PosterPolicy::Placeholder) => {
            warn!(title = %title, reason = %reason, "poster lookup failed, using placeholder");
            Ok(placeholder.to_string())
        },
        (PosterLookup::Missing(reason), PosterPolicy::FailFast) => {
            Err(RefreshError::EnrichmentFailure { title: title.to_string(), reason })
        },
    }
}
