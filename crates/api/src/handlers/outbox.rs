use axum::{
    Json,
    extract::{Query, State},
};
use courtcall_core::{
    models::outbox::OutboxMessage,
    store::{CandidateRanker, Store},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{ApiState, middleware::error_handling::AppError};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct FailedQuery {
    pub limit: Option<usize>,
}

/// Messages the delivery worker gave up on, newest first.
pub async fn failed_messages<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Query(query): Query<FailedQuery>,
) -> Result<Json<Vec<OutboxMessage>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let messages = state.engine.failed_deliveries(limit).await?;
    Ok(Json(messages))
}
