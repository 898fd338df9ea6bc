use axum::{Router, routing::post};
use courtcall_core::store::{CandidateRanker, Store};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes<S: Store, R: CandidateRanker>() -> Router<Arc<ApiState<S, R>>> {
    Router::new().route("/sms/inbound", post(handlers::sms::inbound_sms::<S, R>))
}
