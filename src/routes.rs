use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use jiff::{SignedDuration, Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, classify, clock,
    error::{AppError, AppResult},
    models::Title,
    ticket::{SeatCode, Ticket},
};

#[derive(Debug, Serialize)]
pub struct ListingsView {
    pub date: Date,
    pub now: String,
    pub titles: Vec<ListingTitle>,
}

#[derive(Debug, Serialize)]
pub struct ListingTitle {
    pub name: String,
    pub machine_name: String,
    pub duration: i32,
    pub classification: String,
    pub poster: String,
    pub has_imminent: bool,
    pub performances: Vec<ListingPerformance>,
}

#[derive(Debug, Serialize)]
pub struct ListingPerformance {
    pub performance_id: String,
    pub start: String,
    pub format: String,
    pub language: String,
    pub hall: String,
    pub imminent: bool,
    pub showing: bool,
}

pub fn listings_view(
    date: Date,
    now: Timestamp,
    window: SignedDuration,
    titles: Vec<Title>,
) -> ListingsView {
    let titles = classify::classify(titles, now, window)
        .into_iter()
        .map(|t| ListingTitle {
            has_imminent: classify::has_imminent(&t, now, window),
            performances: t
                .performances
                .iter()
                .map(|p| ListingPerformance {
                    performance_id: p.performance_id.clone(),
                    start: clock::to_wire(&p.start),
                    format: p.format.clone(),
                    language: p.language.clone(),
                    hall: p.hall.clone(),
                    imminent: classify::is_imminent(p, now, window),
                    showing: classify::is_showing(p, now, window),
                })
                .collect(),
            name: t.name,
            machine_name: t.machine_name,
            duration: t.duration,
            classification: t.classification,
            poster: t.poster,
        })
        .collect();

    ListingsView { date, now: clock::to_wire(&clock::to_exhibition(now)), titles }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn listings(State(state): State<Arc<AppState>>) -> AppResult<Json<ListingsView>> {
    // One clock read labels the view and picks the day it is built from.
    let now = Timestamp::now();
    let today = clock::to_exhibition(now).date();
    let titles = state.coordinator.ensure_listings_for(today).await?;
    Ok(Json(listings_view(today, now, state.config.imminent_window(), titles)))
}

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    #[serde(default)]
    title: String,
    #[serde(default)]
    performance_id: String,
}

pub async fn ticket(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TicketQuery>,
) -> AppResult<Json<Ticket>> {
    let name = q.title.trim();
    let performance_id = q.performance_id.trim();
    if name.is_empty() || performance_id.is_empty() {
        return Err(AppError::BadRequest("title and performance_id are required".to_string()));
    }

    let titles = state.coordinator.ensure_todays_listings().await?;
    let title = titles
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| AppError::NotFound(format!("no listing for {name:?} today")))?;
    let performance = title.performance(performance_id).ok_or_else(|| {
        AppError::NotFound(format!("no performance {performance_id} for {name:?} today"))
    })?;

    let seat = SeatCode::random(&mut rand::rng());
    Ok(Json(Ticket::for_performance(title, performance, &state.config.venue_name, seat)))
}
