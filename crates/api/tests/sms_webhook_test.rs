mod common;

use axum::http::StatusCode;
use common::{CLUB_NUMBER, TestContext, WEBHOOK_TOKEN};
use courtcall_api::handlers::matches::MatchResponse;
use courtcall_api::handlers::sms::EMPTY_TWIML;
use courtcall_core::models::outbox::MessageKind;
use courtcall_sms::replies;
use pretty_assertions::assert_eq;

fn inbound(from: &str, body: &str) -> [(&'static str, String); 3] {
    [
        ("From", from.to_string()),
        ("To", CLUB_NUMBER.to_string()),
        ("Body", body.to_string()),
    ]
}

#[tokio::test]
async fn test_inbound_text_is_applied_and_reply_queued() {
    let ctx = TestContext::new().await;
    let created = ctx
        .server
        .post("/api/matches")
        .json(&ctx.create_body(&[0]))
        .await
        .json::<MatchResponse>();
    let from = ctx.players[5].phone_number.clone();

    let response = ctx
        .server
        .post("/sms/inbound")
        .add_query_param("token", WEBHOOK_TOKEN)
        .form(&inbound(&from, "1"))
        .await;

    response.assert_status_ok();
    response.assert_text(EMPTY_TWIML);
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/xml"
    );

    let ledger = ctx.engine.ledger(created.court_match.id).await.unwrap();
    assert!(ledger.court_match.is_seated(ctx.player_id(5)));

    let reply = ctx
        .store
        .outbox_messages()
        .await
        .into_iter()
        .find(|m| m.to_number == from)
        .unwrap();
    assert_eq!(reply.kind, MessageKind::Reactive);
    assert_eq!(reply.body, "You're in match #1 on team 1.");
}

#[tokio::test]
async fn test_unparseable_text_gets_help() {
    let ctx = TestContext::new().await;
    let from = ctx.players[1].phone_number.clone();

    ctx.server
        .post("/sms/inbound")
        .add_query_param("token", WEBHOOK_TOKEN)
        .form(&inbound(&from, "lol sure"))
        .await
        .assert_status_ok();

    let queued = ctx.store.outbox_messages().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].body, replies::HELP);
}

#[tokio::test]
async fn test_webhook_requires_token() {
    let ctx = TestContext::new().await;
    let from = ctx.players[1].phone_number.clone();

    ctx.server
        .post("/sms/inbound")
        .form(&inbound(&from, "HELP"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    ctx.server
        .post("/sms/inbound")
        .add_query_param("token", "wrong")
        .form(&inbound(&from, "HELP"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    assert!(ctx.store.outbox_messages().await.is_empty());
}
