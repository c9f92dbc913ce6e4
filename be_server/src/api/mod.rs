//! HTTP API for the bracket server.
//!
//! Exposes bracket generation, the match editor and bye/reset handling as
//! JSON endpoints over a shared [`BracketManager`].
//!
//! # Endpoints Overview
//!
//! - `GET /health` - Server health status
//! - `GET /api/v1/bracket` - Current bracket, or a needs-setup notice
//! - `POST /api/v1/bracket` - Generate a new bracket from entrants
//! - `POST /api/v1/bracket/byes/advance` - Push auto-resolved bye winners forward
//! - `GET /api/v1/matches` - All matches in round order
//! - `GET /api/v1/matches/{id}` - Open a match for editing
//! - `POST /api/v1/matches/{id}/score` - Submit scores and advance the winner
//! - `POST /api/v1/matches/{id}/bye` - Declare a bye and advance the winner
//! - `POST /api/v1/matches/{id}/reset` - Clear a result and retract the winner
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use be_server::api::{create_router, AppState};
//! use bracket_engine::{BracketConfig, BracketManager, InMemoryMatchRepository};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let repo = Arc::new(InMemoryMatchRepository::new());
//! let state = AppState {
//!     bracket_manager: Arc::new(BracketManager::new(repo, BracketConfig::default())?),
//!     pool: None,
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod bracket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use bracket_engine::{BracketError, BracketManager, bracket::ErrorKind};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::logging::log_api_error;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the managers sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub bracket_manager: Arc<BracketManager>,
    /// Connection pool when the Postgres backend is active
    pub pool: Option<Arc<PgPool>>,
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    /// The bracket is missing or malformed and must be generated again
    pub needs_setup: bool,
}

/// Error returned by handlers, mapped onto a status code by error kind
#[derive(Debug)]
pub struct ApiError {
    operation: &'static str,
    error: BracketError,
}

impl ApiError {
    pub fn new(operation: &'static str, error: BracketError) -> Self {
        Self { operation, error }
    }

    pub fn status(&self) -> StatusCode {
        match (&self.error, self.error.kind()) {
            (_, ErrorKind::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
            (BracketError::MatchNotFound(_), _) => StatusCode::NOT_FOUND,
            (_, ErrorKind::DataIntegrity) => StatusCode::CONFLICT,
            (_, ErrorKind::Persistence) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        log_api_error(self.operation, status.as_u16(), &self.error.to_string());

        let kind = self.error.kind();
        let body = ErrorResponse {
            error: self.error.client_message(),
            kind: match kind {
                ErrorKind::Validation => "validation",
                ErrorKind::DataIntegrity => "data_integrity",
                ErrorKind::Persistence => "persistence",
            },
            needs_setup: kind == ErrorKind::DataIntegrity,
        };

        (status, Json(body)).into_response()
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/bracket",
            get(bracket::get_bracket).post(bracket::generate_bracket),
        )
        .route("/bracket/byes/advance", post(bracket::advance_byes))
        .route("/matches", get(bracket::list_matches))
        .route("/matches/{match_id}", get(bracket::open_match))
        .route("/matches/{match_id}/score", post(bracket::submit_score))
        .route("/matches/{match_id}/bye", post(bracket::declare_bye))
        .route("/matches/{match_id}/reset", post(bracket::reset_match))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when match storage answers, `503 Service Unavailable`
/// otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.pool {
        Some(pool) => Some(sqlx::query("SELECT 1").fetch_one(&**pool).await.is_ok()),
        None => None,
    };
    let storage_healthy = state.bracket_manager.list_matches().await.is_ok();
    let overall_healthy = storage_healthy && database.unwrap_or(true);

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "database": database,
        "slot_count": state.bracket_manager.config().slot_count,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
