mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{TestContext, now};
use courtcall_api::handlers::matches::MatchResponse;
use courtcall_core::models::court_match::MatchStatus;
use courtcall_core::models::feedback::ResendFeedbackResponse;
use courtcall_core::models::outbox::OutboxMessage;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use uuid::Uuid;

async fn create(ctx: &TestContext, seated: &[usize]) -> MatchResponse {
    let response = ctx
        .server
        .post("/api/matches")
        .json(&ctx.create_body(seated))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<MatchResponse>()
}

#[tokio::test]
async fn test_health_and_version() {
    let ctx = TestContext::new().await;

    let health = ctx.server.get("/health").await;
    health.assert_status_ok();
    health.assert_json(&json!({ "status": "ok" }));

    let version = ctx.server.get("/version").await.json::<Value>();
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_create_match_seats_players_and_sends_first_batch() {
    let ctx = TestContext::new().await;

    let created = create(&ctx, &[0]).await;

    assert_eq!(created.court_match.number, 1);
    assert_eq!(created.court_match.status, MatchStatus::Pending);
    assert_eq!(created.court_match.team1, vec![ctx.player_id(0)]);
    assert_eq!(created.accepted_count, 1);
    assert_eq!(created.open_seats, 3);
    assert_eq!(created.batches.len(), 1);
    let invited: Vec<Uuid> = created.invites.iter().map(|i| i.player_id).collect();
    assert_eq!(invited, (1..5).map(|i| ctx.player_id(i)).collect::<Vec<_>>());

    let fetched = ctx
        .server
        .get(&format!("/api/matches/{}", created.court_match.id))
        .await
        .json::<MatchResponse>();
    assert_eq!(fetched.court_match.id, created.court_match.id);
    assert_eq!(fetched.invites.len(), 4);
}

#[tokio::test]
async fn test_create_match_rejects_bad_requests() {
    let ctx = TestContext::new().await;

    let mut past = ctx.create_body(&[]);
    past["scheduled_at"] = json!(now() - Duration::hours(1));
    ctx.server
        .post("/api/matches")
        .json(&past)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let mut unknown_club = ctx.create_body(&[]);
    unknown_club["club_id"] = json!(Uuid::new_v4());
    ctx.server
        .post("/api/matches")
        .json(&unknown_club)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let too_many = ctx.create_body(&[0, 1, 2, 3, 4]);
    ctx.server
        .post("/api/matches")
        .json(&too_many)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_club_without_phone_number_is_unprocessable() {
    let ctx = TestContext::with_phone(None).await;

    let response = ctx
        .server
        .post("/api/matches")
        .json(&ctx.create_body(&[]))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .contains("no phone number"));
}

#[tokio::test]
async fn test_unknown_match_is_not_found() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .get(&format!("/api/matches/{}", Uuid::new_v4()))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_assign_and_remove_player() {
    let ctx = TestContext::new().await;
    let created = create(&ctx, &[0]).await;
    let id = created.court_match.id;

    let assigned = ctx
        .server
        .post(&format!("/api/matches/{}/players", id))
        .json(&json!({ "player_id": ctx.player_id(5) }))
        .await
        .json::<MatchResponse>();
    assert_eq!(assigned.accepted_count, 2);
    assert!(assigned.court_match.team1.contains(&ctx.player_id(5)));

    let removed = ctx
        .server
        .delete(&format!("/api/matches/{}/players/{}", id, ctx.player_id(5)))
        .await
        .json::<MatchResponse>();
    assert_eq!(removed.accepted_count, 1);

    ctx.server
        .post(&format!("/api/matches/{}/players", id))
        .json(&json!({ "player_id": Uuid::new_v4() }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_confirm_complete_and_resend_feedback() {
    let ctx = TestContext::new().await;
    let created = create(&ctx, &[0, 5]).await;
    let id = created.court_match.id;

    ctx.server
        .post(&format!("/api/matches/{}/feedback/resend", id))
        .json(&json!({ "force": false }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let confirmed = ctx
        .server
        .post(&format!("/api/matches/{}/confirm", id))
        .await
        .json::<MatchResponse>();
    assert_eq!(confirmed.court_match.status, MatchStatus::Confirmed);

    let completed = ctx
        .server
        .post(&format!("/api/matches/{}/complete", id))
        .json(&json!({ "score": "6-4 7-5" }))
        .await
        .json::<MatchResponse>();
    assert_eq!(completed.court_match.status, MatchStatus::Completed);
    assert_eq!(completed.court_match.score.as_deref(), Some("6-4 7-5"));

    let resent = ctx
        .server
        .post(&format!("/api/matches/{}/feedback/resend", id))
        .json(&json!({}))
        .await
        .json::<ResendFeedbackResponse>();
    assert_eq!(resent.messaged_player_ids, vec![ctx.player_id(0), ctx.player_id(5)]);

    let again = ctx
        .server
        .post(&format!("/api/matches/{}/feedback/resend", id))
        .json(&json!({ "force": false }))
        .await
        .json::<ResendFeedbackResponse>();
    assert!(again.messaged_player_ids.is_empty());
}

#[tokio::test]
async fn test_cancelled_match_rejects_changes() {
    let ctx = TestContext::new().await;
    let created = create(&ctx, &[0]).await;
    let id = created.court_match.id;

    let cancelled = ctx
        .server
        .post(&format!("/api/matches/{}/cancel", id))
        .await
        .json::<MatchResponse>();
    assert_eq!(cancelled.court_match.status, MatchStatus::Cancelled);

    ctx.server
        .post(&format!("/api/matches/{}/complete", id))
        .json(&json!({ "score": null }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_outbox_is_listed() {
    let ctx = TestContext::new().await;

    let failed = ctx
        .server
        .get("/api/outbox/failed")
        .add_query_param("limit", 10)
        .await
        .json::<Vec<OutboxMessage>>();

    assert!(failed.is_empty());
}
