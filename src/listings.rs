use std::collections::HashSet;

use jiff::civil::Date;
use serde::Deserialize;
use tracing::debug;

use crate::{
    clock,
    config::Config,
    error::RefreshError,
    models::{Performance, Title},
};

/// Client for the cinema's `get-performances-by-params` endpoint.
pub struct ListingsClient {
    client: reqwest::Client,
    base_url: String,
    cinema_id: String,
    device_os: String,
    browser_name: String,
}

impl ListingsClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.listings_base_url.clone(),
            cinema_id: config.cinema_id.clone(),
            device_os: config.device_os.clone(),
            browser_name: config.browser_name.clone(),
        }
    }

    pub async fn fetch(&self, date: Date) -> Result<Vec<Title>, RefreshError> {
        let url = format!("{}/get-performances-by-params", self.base_url.trim_end_matches('/'));
        let day = date.to_string();

        debug!(cinema_id = %self.cinema_id, date = %day, "fetching listings");

        let body = self
            .client
            .get(url)
            .query(&[
                ("cinemaId", self.cinema_id.as_str()),
                ("date", day.as_str()),
                ("deviceOS", self.device_os.as_str()),
                ("browserName", self.browser_name.as_str()),
            ])
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| RefreshError::UpstreamUnavailable(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| RefreshError::UpstreamUnavailable(e.to_string()))?;

        let payload: ListingsResponse = serde_json::from_slice(&body)
            .map_err(|e| RefreshError::MalformedUpstreamPayload(e.to_string()))?;

        let titles = payload.into_titles(date)?;
        debug!(date = %day, titles = titles.len(), "parsed listings");
        Ok(titles)
    }
}

#[derive(Debug, Deserialize)]
struct ListingsResponse {
    showtimes: Vec<UpstreamTitle>,
}

#[derive(Debug, Deserialize)]
struct UpstreamTitle {
    name: String,
    machine_name: String,
    duration: Lenient,
    #[serde(default)]
    classification: Option<String>,
    #[serde(default)]
    rating: Option<String>,
    showtimes: Vec<UpstreamShowing>,
}

#[derive(Debug, Deserialize)]
struct UpstreamShowing {
    attributes: Attributes,
    performances: Vec<UpstreamPerformance>,
}

#[derive(Debug, Deserialize)]
struct Attributes {
    format: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamPerformance {
    #[serde(rename = "DateTime")]
    date_time: String,
    #[serde(rename = "Hall")]
    hall: Lenient,
    #[serde(rename = "PerformanceId")]
    performance_id: Lenient,
}

/// The source is loose about numbers: the same field shows up as `5` or `"5"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(i64),
    Text(String),
}

impl Lenient {
    fn into_text(self) -> String {
        match self {
            Lenient::Int(n) => n.to_string(),
            Lenient::Text(s) => s.trim().to_string(),
        }
    }
}

impl ListingsResponse {
    fn into_titles(self, date: Date) -> Result<Vec<Title>, RefreshError> {
        self.showtimes.into_iter().map(|t| t.into_title(date)).collect()
    }
}

impl UpstreamTitle {
    fn into_title(self, date: Date) -> Result<Title, RefreshError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(RefreshError::MalformedUpstreamPayload("title without a name".into()));
        }

        let duration = match self.duration {
            Lenient::Int(n) => i32::try_from(n).ok(),
            Lenient::Text(s) => s.trim().parse().ok(),
        }
        .ok_or_else(|| {
            RefreshError::MalformedUpstreamPayload(format!("{name}: unreadable duration"))
        })?;

        let classification = self.classification.or(self.rating).ok_or_else(|| {
            RefreshError::MalformedUpstreamPayload(format!("{name}: no classification"))
        })?;

        let mut seen = HashSet::new();
        let mut performances = Vec::new();
        for showing in self.showtimes {
            for perf in showing.performances {
                let performance_id = perf.performance_id.into_text();
                if !seen.insert(performance_id.clone()) {
                    continue;
                }
                let start = clock::parse_start(&perf.date_time).map_err(|e| {
                    RefreshError::MalformedUpstreamPayload(format!(
                        "{name}: performance {performance_id} start {:?}: {e}",
                        perf.date_time
                    ))
                })?;
                performances.push(Performance {
                    performance_id,
                    start,
                    format: showing.attributes.format.clone(),
                    language: showing.attributes.language.clone(),
                    hall: perf.hall.into_text(),
                });
            }
        }
        performances.sort_by(|a, b| {
            a.start
                .timestamp()
                .cmp(&b.start.timestamp())
                .then_with(|| a.performance_id.cmp(&b.performance_id))
        });

        Ok(Title {
            name,
            machine_name: self.machine_name,
            duration,
            classification,
            poster: String::new(),
            last_updated: date,
            performances,
        })
    }
}
