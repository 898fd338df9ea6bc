//! Carrier webhook for inbound texts.
//!
//! Replies are queued in the outbox and sent by the delivery worker, so the
//! webhook always answers with an empty TwiML document.

use axum::{
    Form,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use courtcall_core::store::{CandidateRanker, Store};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::{
    ApiState,
    middleware::{auth, error_handling::AppError},
};

pub const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// The subset of the carrier's webhook form we use.
#[derive(Debug, Deserialize)]
pub struct InboundSms {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub token: Option<String>,
}

pub async fn inbound_sms<S: Store, R: CandidateRanker>(
    State(state): State<Arc<ApiState<S, R>>>,
    Query(query): Query<WebhookQuery>,
    Form(payload): Form<InboundSms>,
) -> Result<impl IntoResponse, AppError> {
    auth::verify_webhook_token(state.webhook_token.as_deref(), query.token.as_deref())?;

    let queued = state
        .engine
        .handle_inbound(&payload.from, &payload.to, &payload.body)
        .await?;
    debug!(from = %payload.from, queued = queued.len(), "Inbound SMS handled");

    Ok(([(header::CONTENT_TYPE, "application/xml")], EMPTY_TWIML))
}
