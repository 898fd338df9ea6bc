#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use courtcall_core::clock::ManualClock;
use courtcall_core::ledger::MatchLedger;
use courtcall_core::models::club::{ClubMessagingConfig, Player};
use courtcall_core::models::court_match::CreateMatchRequest;
use courtcall_core::models::outbox::OutboundSms;
use courtcall_db::MemoryStore;
use courtcall_sms::engine::Engine;
use uuid::Uuid;

pub const CLUB_NUMBER: &str = "+15550000000";

/// Saturday 1 June 2024, 10:00 UTC.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
}

pub fn club_config() -> ClubMessagingConfig {
    ClubMessagingConfig {
        club_id: Uuid::new_v4(),
        name: "Riverside".to_string(),
        phone_number: Some(CLUB_NUMBER.to_string()),
        timezone: "UTC".to_string(),
        quiet_hours_start: None,
        quiet_hours_end: None,
        initial_batch_size: 4,
        invite_timeout_minutes: 30,
        feedback_delay_hours: 2,
        feedback_reminder_delay_hours: 24,
        sms_test_mode: false,
        sms_whitelist: vec![],
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub engine: Engine<MemoryStore, MemoryStore>,
    pub club: ClubMessagingConfig,
    /// Ranked strongest first, so invites go out in index order.
    pub players: Vec<Player>,
}

impl Harness {
    pub async fn new(club: ClubMessagingConfig, player_count: usize) -> Self {
        Self::starting_at(club, player_count, start()).await
    }

    pub async fn starting_at(
        club: ClubMessagingConfig,
        player_count: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.insert_club(club.clone()).await;

        let mut players = Vec::new();
        for i in 0..player_count {
            let player = store
                .insert_player(
                    club.club_id,
                    &format!("Player{}", i),
                    &format!("+1555010{:04}", i),
                    Some(5.0 - i as f64 * 0.1),
                )
                .await;
            players.push(player);
        }

        let clock = Arc::new(ManualClock::new(now));
        let engine = Engine::new(store.clone(), store.clone(), clock.clone());

        Self {
            store,
            clock,
            engine,
            club,
            players,
        }
    }

    pub fn phone(&self, player: usize) -> &str {
        &self.players[player].phone_number
    }

    pub fn id(&self, player: usize) -> Uuid {
        self.players[player].id
    }

    pub async fn text(&self, player: usize, body: &str) -> Vec<OutboundSms> {
        self.engine
            .handle_inbound(self.phone(player), CLUB_NUMBER, body)
            .await
            .unwrap()
    }

    /// The reply the player got back (always the first message).
    pub async fn reply(&self, player: usize, body: &str) -> String {
        self.text(player, body).await[0].body.clone()
    }

    pub async fn create_match(&self, seated: &[usize]) -> MatchLedger {
        self.engine
            .create_match(CreateMatchRequest {
                club_id: self.club.club_id,
                scheduled_at: self.clock_now() + Duration::days(2),
                originator_id: None,
                player_ids: seated.iter().map(|i| self.id(*i)).collect(),
            })
            .await
            .unwrap()
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use courtcall_core::clock::Clock;
        self.clock.now()
    }

    pub async fn ledger(&self, match_id: Uuid) -> MatchLedger {
        self.engine.ledger(match_id).await.unwrap()
    }
}
