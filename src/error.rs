use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failures of a single refresh attempt. None of them are fatal to the
/// process; every variant is safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("listings source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("poster lookup failed for {title}: {reason}")]
    EnrichmentFailure { title: String, reason: String },

    #[error("datastore failure: {0}")]
    PersistenceFailure(#[from] sea_orm::DbErr),

    #[error("unexpected listings payload: {0}")]
    MalformedUpstreamPayload(String),
}

impl RefreshError {
    pub fn user_message(&self) -> &'static str {
        "Error loading movies. Please try again later."
    }

    fn code(&self) -> &'static str {
        match self {
            RefreshError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            RefreshError::EnrichmentFailure { .. } => "ENRICHMENT_FAILURE",
            RefreshError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            RefreshError::MalformedUpstreamPayload(_) => "MALFORMED_UPSTREAM_PAYLOAD",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            RefreshError::PersistenceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Refresh(err) => {
                tracing::error!(error = %err, "refresh failed");
                (err.status(), err.code(), err.user_message().to_string())
            },
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "internal error".to_string())
            },
        };
        (status, Json(json!({ "code": code, "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
