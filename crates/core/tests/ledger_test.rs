use chrono::{Duration, TimeZone, Utc};
use courtcall_core::errors::CourtError;
use courtcall_core::ledger::{MatchLedger, Response, ResponseOutcome, WithdrawOutcome};
use courtcall_core::models::court_match::{CourtMatch, MatchStatus, Team};
use courtcall_core::models::invite::InviteStatus;
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
}

fn pending_ledger() -> MatchLedger {
    MatchLedger::new(CourtMatch {
        id: Uuid::new_v4(),
        club_id: Uuid::new_v4(),
        number: 1,
        scheduled_at: now() + Duration::days(2),
        status: MatchStatus::Pending,
        team1: vec![],
        team2: vec![],
        originator_id: None,
        score: None,
        version: 0,
        created_at: now(),
    })
}

fn invited(ledger: &mut MatchLedger, count: usize) -> Vec<Uuid> {
    let batch = ledger.start_round(ledger.last_round() + 1, now()).unwrap();
    (0..count)
        .map(|_| {
            let player = Uuid::new_v4();
            ledger.create_invite(player, batch, false, now()).unwrap();
            player
        })
        .collect()
}

#[test]
fn test_accept_seats_team_one_before_team_two() {
    let mut ledger = pending_ledger();
    let players = invited(&mut ledger, 3);

    let outcomes: Vec<_> = players
        .iter()
        .map(|p| ledger.apply_response(*p, Response::Accept, now()))
        .collect();

    assert_eq!(
        outcomes,
        vec![
            ResponseOutcome::Accepted { team: Team::One, confirmed: false },
            ResponseOutcome::Accepted { team: Team::One, confirmed: false },
            ResponseOutcome::Accepted { team: Team::Two, confirmed: false },
        ]
    );
    assert_eq!(ledger.court_match.team1, players[..2].to_vec());
    assert_eq!(ledger.court_match.team2, vec![players[2]]);
}

#[test]
fn test_fourth_acceptance_confirms_and_fifth_is_full() {
    let mut ledger = pending_ledger();
    let players = invited(&mut ledger, 6);

    for p in &players[..3] {
        ledger.apply_response(*p, Response::Accept, now());
    }
    let fourth = ledger.apply_response(players[3], Response::Accept, now());
    let fifth = ledger.apply_response(players[4], Response::Accept, now());

    assert_eq!(
        fourth,
        ResponseOutcome::Accepted { team: Team::Two, confirmed: true }
    );
    assert_eq!(fifth, ResponseOutcome::MatchFull);
    assert_eq!(ledger.status(), MatchStatus::Confirmed);
    assert_eq!(ledger.accepted_count(), 4);
    ledger.check_invariants().unwrap();

    // Everyone still waiting is expired once the match fills.
    for p in &players[4..] {
        let statuses: Vec<_> = ledger.invites_for(*p).map(|i| i.status).collect();
        assert_eq!(statuses, vec![InviteStatus::Expired]);
    }
}

#[test]
fn test_duplicate_active_invite_is_rejected() {
    let mut ledger = pending_ledger();
    let player = invited(&mut ledger, 1)[0];

    let result = ledger.create_invite(player, None, false, now());

    assert!(matches!(
        result,
        Err(CourtError::DuplicateActiveInvite { player_id, .. }) if player_id == player
    ));
}

#[test]
fn test_declined_player_may_be_invited_again_later() {
    let mut ledger = pending_ledger();
    let player = invited(&mut ledger, 1)[0];
    assert_eq!(
        ledger.apply_response(player, Response::Decline, now()),
        ResponseOutcome::Declined
    );

    ledger.create_invite(player, None, false, now()).unwrap();
    assert_eq!(ledger.invites_for(player).count(), 2);
}

#[test]
fn test_gated_invite_starts_pending_sms_until_dispatched() {
    let mut ledger = pending_ledger();
    let player = Uuid::new_v4();
    let invite = ledger.create_invite(player, None, true, now()).unwrap();

    assert_eq!(invite.status, InviteStatus::PendingSms);
    assert_eq!(invite.sent_at, None);

    assert!(ledger.mark_dispatched(invite.id, now() + Duration::hours(9)));
    let stored = ledger.active_invite(player).unwrap();
    assert_eq!(stored.status, InviteStatus::Sent);
    assert_eq!(stored.sent_at, Some(now() + Duration::hours(9)));
    assert!(!ledger.mark_dispatched(invite.id, now()));
}

#[test]
fn test_maybe_keeps_invite_active() {
    let mut ledger = pending_ledger();
    let player = invited(&mut ledger, 1)[0];

    assert_eq!(
        ledger.apply_response(player, Response::Maybe, now()),
        ResponseOutcome::Maybe
    );
    assert!(ledger.active_invite(player).is_some());
    assert_eq!(
        ledger.apply_response(player, Response::Accept, now()),
        ResponseOutcome::Accepted { team: Team::One, confirmed: false }
    );
}

#[test]
fn test_decline_without_invite() {
    let mut ledger = pending_ledger();
    assert_eq!(
        ledger.apply_response(Uuid::new_v4(), Response::Decline, now()),
        ResponseOutcome::NoActiveInvite
    );
}

#[test]
fn test_walk_in_join_creates_accepted_invite() {
    let mut ledger = pending_ledger();
    let player = Uuid::new_v4();

    ledger.apply_response(player, Response::Accept, now());

    let invites: Vec<_> = ledger.invites_for(player).collect();
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].status, InviteStatus::Accepted);
    assert_eq!(invites[0].batch_id, None);
}

#[test]
fn test_accepting_twice_is_idempotent() {
    let mut ledger = pending_ledger();
    let player = invited(&mut ledger, 1)[0];

    ledger.apply_response(player, Response::Accept, now());
    assert_eq!(
        ledger.apply_response(player, Response::Accept, now()),
        ResponseOutcome::AlreadyAccepted
    );
    assert_eq!(ledger.accepted_count(), 1);
}

#[test]
fn test_synthetic_participants_count_toward_capacity() {
    let mut ledger = pending_ledger();
    let originator = Uuid::new_v4();
    let assigned = [Uuid::new_v4(), Uuid::new_v4()];

    assert_eq!(ledger.add_participant(originator, now()).unwrap(), Team::One);
    for p in assigned {
        ledger.add_participant(p, now()).unwrap();
    }
    let invitees = invited(&mut ledger, 2);

    assert_eq!(
        ledger.apply_response(invitees[0], Response::Accept, now()),
        ResponseOutcome::Accepted { team: Team::Two, confirmed: true }
    );
    assert_eq!(
        ledger.apply_response(invitees[1], Response::Accept, now()),
        ResponseOutcome::MatchFull
    );
    assert!(ledger.invites_for(originator).next().is_none());
    ledger.check_invariants().unwrap();
}

#[test]
fn test_add_participant_to_full_match_fails() {
    let mut ledger = pending_ledger();
    for _ in 0..4 {
        ledger.add_participant(Uuid::new_v4(), now()).unwrap();
    }

    // Four seats filled confirms the match; there is nowhere left to sit.
    assert!(matches!(
        ledger.add_participant(Uuid::new_v4(), now()),
        Err(CourtError::Validation(_))
    ));
}

#[test]
fn test_cancel_expires_invites_and_blocks_responses() {
    let mut ledger = pending_ledger();
    let players = invited(&mut ledger, 2);
    ledger.apply_response(players[0], Response::Accept, now());

    let notify = ledger.cancel(now()).unwrap();

    assert_eq!(notify, players);
    assert_eq!(ledger.status(), MatchStatus::Cancelled);
    assert_eq!(
        ledger.apply_response(players[1], Response::Accept, now()),
        ResponseOutcome::MatchClosed(MatchStatus::Cancelled)
    );
    assert!(ledger.invites.iter().all(|i| i.status != InviteStatus::Sent));
    // Nothing was deleted.
    assert_eq!(ledger.invites.len(), 2);
    assert_eq!(ledger.cancel(now()).unwrap(), Vec::<Uuid>::new());
}

#[test]
fn test_manual_confirm_with_fewer_players() {
    let mut ledger = pending_ledger();
    assert!(matches!(ledger.confirm(now()), Err(CourtError::Validation(_))));

    ledger.add_participant(Uuid::new_v4(), now()).unwrap();
    ledger.add_participant(Uuid::new_v4(), now()).unwrap();
    ledger.confirm(now()).unwrap();

    assert_eq!(ledger.status(), MatchStatus::Confirmed);
    assert_eq!(
        ledger.apply_response(Uuid::new_v4(), Response::Accept, now()),
        ResponseOutcome::MatchClosed(MatchStatus::Confirmed)
    );
}

#[test]
fn test_withdraw_reopens_confirmed_match() {
    let mut ledger = pending_ledger();
    let players = invited(&mut ledger, 4);
    for p in &players {
        ledger.apply_response(*p, Response::Accept, now());
    }
    assert_eq!(ledger.status(), MatchStatus::Confirmed);

    let outcome = ledger.withdraw(players[1], now());

    assert_eq!(outcome, WithdrawOutcome::Withdrawn { reopened: true });
    assert_eq!(ledger.status(), MatchStatus::Pending);
    assert_eq!(ledger.accepted_count(), 3);
    assert_eq!(
        ledger.withdraw(players[1], now()),
        WithdrawOutcome::NotParticipating
    );
}

#[test]
fn test_removed_player_cannot_rejoin() {
    let mut ledger = pending_ledger();
    let player = invited(&mut ledger, 1)[0];
    ledger.apply_response(player, Response::Accept, now());

    ledger.remove_player(player, now()).unwrap();

    assert_eq!(ledger.accepted_count(), 0);
    assert_eq!(
        ledger.apply_response(player, Response::Accept, now()),
        ResponseOutcome::NotEligible
    );
    assert!(matches!(
        ledger.remove_player(Uuid::new_v4(), now()),
        Err(CourtError::NotFound(_))
    ));
}

#[test]
fn test_round_idempotency_and_exclusions() {
    let mut ledger = pending_ledger();
    let first = invited(&mut ledger, 3);

    assert!(ledger.start_round(1, now()).unwrap().is_none());

    let second = ledger.start_round(2, now() + Duration::minutes(15)).unwrap();
    assert!(second.is_some());
    let batch = ledger.last_batch().unwrap();
    assert_eq!(batch.round, 2);
    assert_eq!(batch.idempotency_key, format!("{}:2", ledger.match_id()));
    for p in &first {
        assert!(batch.excluded_player_ids.contains(p));
    }
    assert_eq!(
        ledger.next_round_due_at(Duration::minutes(15), None),
        Some(now() + Duration::minutes(30))
    );
    // Texts held until later push the timeout back; an earlier release does not.
    assert_eq!(
        ledger.next_round_due_at(Duration::minutes(15), Some(now() + Duration::hours(3))),
        Some(now() + Duration::hours(3) + Duration::minutes(15))
    );
    assert_eq!(
        ledger.next_round_due_at(Duration::minutes(15), Some(now())),
        Some(now() + Duration::minutes(30))
    );
}

#[test]
fn test_complete_requires_confirmed() {
    let mut ledger = pending_ledger();
    assert!(matches!(
        ledger.complete(None),
        Err(CourtError::MatchClosed { status: MatchStatus::Pending, .. })
    ));

    ledger.add_participant(Uuid::new_v4(), now()).unwrap();
    ledger.confirm(now()).unwrap();
    ledger.complete(Some("6-4 6-3".to_string())).unwrap();

    assert_eq!(ledger.status(), MatchStatus::Completed);
    assert_eq!(ledger.court_match.score.as_deref(), Some("6-4 6-3"));
}

#[test]
fn test_undeliverable_invite_expires() {
    let mut ledger = pending_ledger();
    let invite = ledger.create_invite(Uuid::new_v4(), None, true, now()).unwrap();

    assert!(ledger.expire_undeliverable(invite.id, now()));
    assert_eq!(ledger.invites[0].status, InviteStatus::Expired);
}
