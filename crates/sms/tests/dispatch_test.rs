mod common;

use chrono::{DateTime, TimeZone, Utc};
use common::{Harness, club_config};
use courtcall_core::models::club::ClubMessagingConfig;
use courtcall_core::models::invite::InviteStatus;
use courtcall_core::models::outbox::OutboundSms;
use courtcall_sms::dispatch::Dispatcher;
use courtcall_db::MemoryStore;
use pretty_assertions::assert_eq;

fn quiet_club(timezone: &str) -> ClubMessagingConfig {
    ClubMessagingConfig {
        timezone: timezone.to_string(),
        quiet_hours_start: Some(21),
        quiet_hours_end: Some(8),
        ..club_config()
    }
}

fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
}

fn dispatcher(h: &Harness) -> Dispatcher<MemoryStore> {
    Dispatcher::new(h.store.clone(), h.clock.clone())
}

#[tokio::test]
async fn test_proactive_text_waits_for_quiet_hours_to_end() {
    let h = Harness::starting_at(quiet_club("UTC"), 2, utc(1, 22, 0)).await;
    let dispatcher = dispatcher(&h);

    assert!(dispatcher.is_gated(&h.club).unwrap());
    let notice = dispatcher
        .send(&h.club, OutboundSms::notice(h.phone(0), "Match #1 is confirmed."))
        .await
        .unwrap()
        .unwrap();
    let reply = dispatcher
        .send(&h.club, OutboundSms::reply(h.phone(0), "Thanks!"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(notice.send_after, utc(2, 8, 0));
    assert_eq!(reply.send_after, utc(1, 22, 0));
}

#[tokio::test]
async fn test_quiet_hours_use_club_timezone() {
    // 02:30 UTC is 22:30 in New York during summer time.
    let h = Harness::starting_at(quiet_club("America/New_York"), 1, utc(2, 2, 30)).await;

    let queued = dispatcher(&h)
        .send(&h.club, OutboundSms::notice(h.phone(0), "hello"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(queued.send_after, utc(2, 12, 0));
}

#[tokio::test]
async fn test_outside_quiet_hours_sends_immediately() {
    let h = Harness::starting_at(quiet_club("UTC"), 1, utc(1, 20, 59)).await;
    let dispatcher = dispatcher(&h);

    assert!(!dispatcher.is_gated(&h.club).unwrap());
    let queued = dispatcher
        .send(&h.club, OutboundSms::notice(h.phone(0), "hello"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(queued.send_after, utc(1, 20, 59));
}

#[tokio::test]
async fn test_invites_created_in_quiet_hours_wait_for_dispatch() {
    let h = Harness::starting_at(quiet_club("UTC"), 6, utc(1, 22, 0)).await;

    let ledger = h.create_match(&[]).await;
    h.engine.scheduler().disarm(ledger.match_id());

    assert_eq!(ledger.invites.len(), 4);
    assert!(ledger.invites.iter().all(|i| i.status == InviteStatus::PendingSms));
    assert!(ledger.invites.iter().all(|i| i.sent_at.is_none()));
    let texts = h.store.outbox_messages().await;
    assert!(texts.iter().all(|t| t.send_after == utc(2, 8, 0)));
}

#[tokio::test]
async fn test_test_mode_only_texts_whitelisted_numbers() {
    let club = ClubMessagingConfig {
        sms_test_mode: true,
        sms_whitelist: vec!["+15550100000".to_string()],
        ..club_config()
    };
    let h = Harness::new(club, 6).await;
    let dispatcher = dispatcher(&h);

    let allowed = dispatcher
        .send(&h.club, OutboundSms::notice(h.phone(0), "hello"))
        .await
        .unwrap();
    let dropped = dispatcher
        .send(&h.club, OutboundSms::notice(h.phone(1), "hello"))
        .await
        .unwrap();
    assert!(allowed.is_some());
    assert!(dropped.is_none());

    // Replies are filtered the same way, but the command still applies.
    let ledger = h.create_match(&[]).await;
    let messages = h.text(1, "YES").await;
    assert_eq!(messages[0].body, "You're in match #1 on team 1.");
    assert!(h.ledger(ledger.match_id()).await.court_match.is_seated(h.id(1)));

    let recipients: Vec<String> = h
        .store
        .outbox_messages()
        .await
        .into_iter()
        .map(|m| m.to_number)
        .collect();
    assert!(recipients.iter().all(|n| n == "+15550100000"));
    // One direct notice plus player 0's invite.
    assert_eq!(recipients.len(), 2);
}
