use axum::{Router, routing::get};
use courtcall_core::store::{CandidateRanker, Store};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes<S: Store, R: CandidateRanker>() -> Router<Arc<ApiState<S, R>>> {
    Router::new().route(
        "/api/outbox/failed",
        get(handlers::outbox::failed_messages::<S, R>),
    )
}
