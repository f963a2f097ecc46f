mod cache;
mod classify;
mod clock;
mod config;
mod db;
mod entities;
mod error;
mod listings;
mod models;
mod posters;
mod refresh;
mod routes;
#[cfg(test)]
mod testing;
mod ticket;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{cache::ListingStore, config::Config, refresh::Coordinator};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: Arc<Coordinator>,
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/listings", get(routes::listings))
        .route("/ticket", get(routes::ticket))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cartelera=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("cartelera/0.1")
        .timeout(config.http_timeout)
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let coordinator = Coordinator::new(config.clone(), http, ListingStore::new(db));

    let state = Arc::new(AppState { config: config.clone(), coordinator: Arc::new(coordinator) });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(
        addr = %config.addr,
        cinema_id = %config.cinema_id,
        tz = clock::EXHIBITION_TZ_NAME,
        "listening"
    );
    axum::serve(listener, app(state)).await?;

    Ok(())
}
