//! Bracket and match editor API handlers.
//!
//! Generate a bracket:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/bracket \
//!   -H "Content-Type: application/json" \
//!   -d '{"entrants_text": "Alice\nBob\nCarol\nDave"}'
//! ```
//!
//! Submit a score:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/matches/R1-M1/score \
//!   -H "Content-Type: application/json" \
//!   -d '{"score1": 3, "score2": 1}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bracket_engine::{
    BracketError, BracketState, EditSession, Match, TeamSlot,
    bracket::{
        EditView, FeedTarget, GenerationReport, OrphanedResult, ResetOutcome, RoundView,
        ScoreSubmission, StaleLink, SubmitOutcome, parse_entrants,
    },
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{ApiError, AppState};
use crate::logging::log_performance;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Entrants for a new bracket, as a list or as pasted text
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub entrants: Option<Vec<String>>,
    /// One entrant per line; blank lines are skipped
    #[serde(default)]
    pub entrants_text: Option<String>,
}

impl GenerateRequest {
    fn into_entrants(self) -> Vec<String> {
        let mut entrants = self.entrants.unwrap_or_default();
        if let Some(text) = self.entrants_text {
            entrants.extend(parse_entrants(&text));
        }
        entrants
    }
}

#[derive(Debug, Serialize)]
pub struct BracketResponse<'a> {
    pub needs_setup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub rounds: Vec<RoundView<'a>>,
    pub champion: Option<&'a str>,
    pub stale_links: Vec<StaleLink>,
    pub orphaned_results: Vec<OrphanedResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenMatchResponse {
    /// Handle to send back with score, bye and reset requests
    pub session: EditSession,
    pub view: EditView,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    /// Session from `GET /matches/{id}`; a fresh one is opened when absent
    #[serde(default)]
    pub session: Option<EditSession>,
    #[serde(flatten)]
    pub submission: ScoreSubmission,
}

#[derive(Debug, Default, Deserialize)]
pub struct ByeRequest {
    #[serde(default)]
    pub session: Option<EditSession>,
    #[serde(default)]
    pub manual_winner: Option<TeamSlot>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub session: Option<EditSession>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvanceByesResponse {
    pub advanced: Vec<FeedTarget>,
}

/// Resolve the session for `match_id`, opening one if the client sent none
async fn session_for(
    state: &AppState,
    match_id: &str,
    session: Option<EditSession>,
    operation: &'static str,
) -> Result<EditSession, ApiError> {
    match session {
        Some(session) if session.match_identifier == match_id => Ok(session),
        Some(session) => Err(ApiError::new(
            operation,
            BracketError::Integrity(format!(
                "session for {} sent to {}",
                session.match_identifier, match_id
            )),
        )),
        None => state
            .bracket_manager
            .load_for_edit(match_id)
            .await
            .map(|(session, _)| session)
            .map_err(|e| ApiError::new(operation, e)),
    }
}

/// Current bracket grouped by round.
///
/// Returns `200 OK` in both cases; `needs_setup` is `true` when no usable
/// bracket is stored.
pub async fn get_bracket(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let loaded = state
        .bracket_manager
        .load_bracket()
        .await
        .map_err(|e| ApiError::new("get_bracket", e))?;

    let response = match &loaded {
        BracketState::Ready(bracket) => BracketResponse {
            needs_setup: false,
            reason: None,
            rounds: bracket.rounds(),
            champion: bracket.champion(),
            stale_links: bracket.stale_links(),
            orphaned_results: bracket.orphaned_results(),
        },
        BracketState::NeedsSetup { reason } => BracketResponse {
            needs_setup: true,
            reason: Some(reason.clone()),
            rounds: Vec::new(),
            champion: None,
            stale_links: Vec::new(),
            orphaned_results: Vec::new(),
        },
    };

    serde_json::to_value(&response)
        .map(Json)
        .map_err(|e| ApiError::new("get_bracket", BracketError::Storage(e.to_string())))
}

/// Replace the stored bracket with a freshly generated one.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: an entrant uses a reserved name
/// - `503 Service Unavailable`: storage failed
pub async fn generate_bracket(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerationReport>), ApiError> {
    let entrants = request.into_entrants();
    let start = Instant::now();

    let report = state
        .bracket_manager
        .generate(&entrants)
        .await
        .map_err(|e| ApiError::new("generate_bracket", e))?;

    let metadata = format!("{} entrants", report.entrant_count);
    log_performance("generate_bracket", start.elapsed(), Some(&metadata));
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn advance_byes(State(state): State<AppState>) -> ApiResult<AdvanceByesResponse> {
    let advanced = state
        .bracket_manager
        .advance_auto_byes()
        .await
        .map_err(|e| ApiError::new("advance_byes", e))?;
    Ok(Json(AdvanceByesResponse { advanced }))
}

pub async fn list_matches(State(state): State<AppState>) -> ApiResult<Vec<Match>> {
    state
        .bracket_manager
        .list_matches()
        .await
        .map(Json)
        .map_err(|e| ApiError::new("list_matches", e))
}

/// Open a match for editing.
///
/// # Errors
///
/// - `404 Not Found`: no match with this identifier
pub async fn open_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> ApiResult<OpenMatchResponse> {
    let (session, view) = state
        .bracket_manager
        .load_for_edit(&match_id)
        .await
        .map_err(|e| ApiError::new("open_match", e))?;
    Ok(Json(OpenMatchResponse { session, view }))
}

/// Record scores and advance the winner one round.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: tie without a pick, or a placeholder winner
/// - `409 Conflict`: session does not match the stored match
/// - `503 Service Unavailable`: storage failed, possibly after the result was saved
pub async fn submit_score(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<SubmitOutcome> {
    let session = session_for(&state, &match_id, request.session, "submit_score").await?;
    state
        .bracket_manager
        .submit(&session, request.submission)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("submit_score", e))
}

/// Declare a bye; the body is optional and may name the advancing side
pub async fn declare_bye(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    request: Option<Json<ByeRequest>>,
) -> ApiResult<SubmitOutcome> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let session = session_for(&state, &match_id, request.session, "declare_bye").await?;
    state
        .bracket_manager
        .declare_bye(&session, request.manual_winner)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("declare_bye", e))
}

/// Reset a match; the body is optional
pub async fn reset_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    request: Option<Json<ResetRequest>>,
) -> ApiResult<ResetOutcome> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let session = session_for(&state, &match_id, request.session, "reset_match").await?;
    state
        .bracket_manager
        .reset(&session)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("reset_match", e))
}
