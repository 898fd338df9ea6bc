use axum::{
    Router,
    routing::{delete, get, post},
};
use courtcall_core::store::{CandidateRanker, Store};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes<S: Store, R: CandidateRanker>() -> Router<Arc<ApiState<S, R>>> {
    Router::new()
        .route("/api/matches", post(handlers::matches::create_match::<S, R>))
        .route("/api/matches/:id", get(handlers::matches::get_match::<S, R>))
        .route(
            "/api/matches/:id/players",
            post(handlers::matches::assign_player::<S, R>),
        )
        .route(
            "/api/matches/:id/players/:player_id",
            delete(handlers::matches::remove_player::<S, R>),
        )
        .route(
            "/api/matches/:id/confirm",
            post(handlers::matches::confirm_match::<S, R>),
        )
        .route(
            "/api/matches/:id/cancel",
            post(handlers::matches::cancel_match::<S, R>),
        )
        .route(
            "/api/matches/:id/complete",
            post(handlers::matches::complete_match::<S, R>),
        )
        .route(
            "/api/matches/:id/feedback/resend",
            post(handlers::matches::resend_feedback::<S, R>),
        )
}
