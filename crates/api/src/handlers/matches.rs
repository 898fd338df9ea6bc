//! Admin endpoints for match requests.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use courtcall_core::{
    ledger::MatchLedger,
    models::{
        court_match::{AssignPlayerRequest, CompleteMatchRequest, CourtMatch, CreateMatchRequest},
        feedback::{ResendFeedbackRequest, ResendFeedbackResponse},
        invite::{Batch, Invite},
    },
    store::{CandidateRanker, Store},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiState, middleware::error_handling::AppError};

/// A match together with its invite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub court_match: CourtMatch,
    pub accepted_count: usize,
    pub open_seats: usize,
    pub invites: Vec<Invite>,
    pub batches: Vec<Batch>,
}

impl From<MatchLedger> for MatchResponse {
    fn from(ledger: MatchLedger) -> Self {
        Self {
            accepted_count: ledger.accepted_count(),
            open_seats: ledger.open_seats(),
            court_match: ledger.court_match,
            invites: ledger.invites,
            batches: ledger.batches,
        }
    }
}

pub async fn create_match<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), AppError> {
    let ledger = state.engine.create_match(payload).await?;
    Ok((StatusCode::CREATED, Json(ledger.into())))
}

pub async fn get_match<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchResponse>, AppError> {
    let ledger = state.engine.ledger(id).await?;
    Ok(Json(ledger.into()))
}

pub async fn assign_player<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignPlayerRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let ledger = state.engine.assign_player(id, payload.player_id).await?;
    Ok(Json(ledger.into()))
}

pub async fn remove_player<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MatchResponse>, AppError> {
    let ledger = state.engine.remove_player(id, player_id).await?;
    Ok(Json(ledger.into()))
}

pub async fn confirm_match<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchResponse>, AppError> {
    let ledger = state.engine.confirm(id).await?;
    Ok(Json(ledger.into()))
}

pub async fn cancel_match<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchResponse>, AppError> {
    let ledger = state.engine.cancel(id).await?;
    Ok(Json(ledger.into()))
}

pub async fn complete_match<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteMatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let ledger = state.engine.complete(id, payload.score).await?;
    Ok(Json(ledger.into()))
}

pub async fn resend_feedback<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResendFeedbackRequest>,
) -> Result<Json<ResendFeedbackResponse>, AppError> {
    let response = state.engine.resend_feedback(id, payload.force).await?;
    Ok(Json(response))
}
