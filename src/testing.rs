//! In-process stand-ins for the listings and poster sources.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};

use crate::{cache::ListingStore, config::Config, refresh::Coordinator};

#[derive(Clone, Copy, Debug)]
pub enum ListingsMode {
    Ok,
    Unavailable,
    Malformed,
    /// Accepts the request and never answers within any sane timeout.
    Hang,
}

#[derive(Clone, Copy, Debug)]
pub enum PosterMode {
    Found,
    NotFound,
    Broken,
}

#[derive(Clone)]
pub struct Upstream {
    pub addr: SocketAddr,
    pub listings_hits: Arc<AtomicUsize>,
    pub poster_hits: Arc<AtomicUsize>,
    /// Highest number of poster requests seen open at the same time.
    pub max_posters_in_flight: Arc<AtomicUsize>,
    posters_in_flight: Arc<AtomicUsize>,
    listings_mode: Arc<Mutex<ListingsMode>>,
    poster_mode: Arc<Mutex<PosterMode>>,
    poster_overrides: Arc<Mutex<HashMap<String, PosterMode>>>,
}

impl Upstream {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let upstream = Self {
            addr: listener.local_addr().expect("local addr"),
            listings_hits: Arc::default(),
            poster_hits: Arc::default(),
            max_posters_in_flight: Arc::default(),
            posters_in_flight: Arc::default(),
            listings_mode: Arc::new(Mutex::new(ListingsMode::Ok)),
            poster_mode: Arc::new(Mutex::new(PosterMode::Found)),
            poster_overrides: Arc::default(),
        };

        let app = Router::new()
            .route("/cineco/get-performances-by-params", get(listings))
            .route("/omdb/", get(poster))
            .with_state(upstream.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve upstream") });

        upstream
    }

    pub fn set_listings(&self, mode: ListingsMode) {
        *self.listings_mode.lock().unwrap() = mode;
    }

    pub fn set_posters(&self, mode: PosterMode) {
        *self.poster_mode.lock().unwrap() = mode;
    }

    /// Overrides the poster answer for one title only.
    pub fn set_poster_for(&self, title: &str, mode: PosterMode) {
        self.poster_overrides.lock().unwrap().insert(title.to_string(), mode);
    }
}

pub fn test_config(upstream: &Upstream) -> Config {
    Config {
        listings_base_url: format!("http://{}/cineco", upstream.addr),
        poster_base_url: format!("http://{}/omdb/", upstream.addr),
        ..Config::default()
    }
}

pub fn test_coordinator(config: Config, store: ListingStore) -> Coordinator {
    let http = reqwest::Client::builder().timeout(config.http_timeout).build().expect("client");
    Coordinator::new(Arc::new(config), http, store)
}

/// Two titles for `date`; performance 1002 is listed under both formats to
/// exercise de-duplication.
pub fn listings_payload(date: &str) -> Value {
    json!({
        "showtimes": [
            {
                "name": "Beetlejuice Beetlejuice",
                "machine_name": "beetlejuice-beetlejuice",
                "duration": "104",
                "classification": "12",
                "showtimes": [
                    {
                        "attributes": { "format": "2D", "language": "Subtitulada" },
                        "performances": [
                            { "DateTime": format!("{date}T14:30:00-05:00"), "Hall": 3, "PerformanceId": "1001" },
                            { "DateTime": format!("{date}T20:40:00-05:00"), "Hall": 3, "PerformanceId": "1002" }
                        ]
                    },
                    {
                        "attributes": { "format": "3D", "language": "Doblada" },
                        "performances": [
                            { "DateTime": format!("{date}T20:40:00-05:00"), "Hall": 3, "PerformanceId": 1002 },
                            { "DateTime": format!("{date}T17:00:00-05:00"), "Hall": "5", "PerformanceId": 1003 }
                        ]
                    }
                ]
            },
            {
                "name": "Alien: Romulus",
                "machine_name": "alien-romulus",
                "duration": 119,
                "rating": "15",
                "showtimes": [
                    {
                        "attributes": { "format": "2D", "language": "Doblada" },
                        "performances": [
                            { "DateTime": format!("{date}T16:00:00-05:00"), "Hall": 5, "PerformanceId": 2001 }
                        ]
                    }
                ]
            }
        ]
    })
}

async fn listings(
    State(upstream): State<Upstream>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    upstream.listings_hits.fetch_add(1, Ordering::SeqCst);
    let mode = *upstream.listings_mode.lock().unwrap();
    match mode {
        ListingsMode::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        ListingsMode::Malformed => Json(json!({ "showtimes": "maintenance" })).into_response(),
        ListingsMode::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        },
        ListingsMode::Ok => {
            let date = q.get("date").cloned().unwrap_or_default();
            Json(listings_payload(&date)).into_response()
        },
    }
}

async fn poster(
    State(upstream): State<Upstream>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    upstream.poster_hits.fetch_add(1, Ordering::SeqCst);
    let open = upstream.posters_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    upstream.max_posters_in_flight.fetch_max(open, Ordering::SeqCst);
    // Hold the request open long enough for concurrent lookups to overlap.
    tokio::time::sleep(Duration::from_millis(50)).await;
    upstream.posters_in_flight.fetch_sub(1, Ordering::SeqCst);

    if q.get("apikey").is_none_or(|key| key.is_empty()) {
        let body = json!({ "Response": "False", "Error": "No API key provided." });
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    let title = q.get("t").cloned().unwrap_or_default();
    let mode = upstream
        .poster_overrides
        .lock()
        .unwrap()
        .get(&title)
        .copied()
        .unwrap_or_else(|| *upstream.poster_mode.lock().unwrap());
    match mode {
        PosterMode::Found => Json(json!({
            "Title": title,
            "Poster": format!("https://posters.example/{}.jpg", urlencoding::encode(&title)),
            "Response": "True"
        }))
        .into_response(),
        PosterMode::NotFound => {
            Json(json!({ "Response": "False", "Error": "Movie not found!" })).into_response()
        },
        PosterMode::Broken => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
