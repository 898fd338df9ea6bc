#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use chrono::{DateTime, Duration, TimeZone, Utc};
use courtcall_api::{ApiState, router};
use courtcall_core::clock::ManualClock;
use courtcall_core::models::club::{ClubMessagingConfig, Player};
use courtcall_db::MemoryStore;
use courtcall_sms::engine::Engine;
use serde_json::{Value, json};
use uuid::Uuid;

pub const CLUB_NUMBER: &str = "+15550000000";
pub const WEBHOOK_TOKEN: &str = "webhook-secret";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
}

pub struct TestContext {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub engine: Engine<MemoryStore, MemoryStore>,
    pub club_id: Uuid,
    pub players: Vec<Player>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_phone(Some(CLUB_NUMBER)).await
    }

    pub async fn with_phone(phone_number: Option<&str>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let club = ClubMessagingConfig {
            club_id: Uuid::new_v4(),
            name: "Riverside".to_string(),
            phone_number: phone_number.map(str::to_string),
            timezone: "Europe/London".to_string(),
            quiet_hours_start: None,
            quiet_hours_end: None,
            initial_batch_size: 4,
            invite_timeout_minutes: 30,
            feedback_delay_hours: 2,
            feedback_reminder_delay_hours: 24,
            sms_test_mode: false,
            sms_whitelist: vec![],
        };
        store.insert_club(club.clone()).await;

        let mut players = Vec::new();
        for (i, name) in ["Ana", "Ben", "Cat", "Dev", "Eli", "Fay"].iter().enumerate() {
            players.push(
                store
                    .insert_player(
                        club.club_id,
                        name,
                        &format!("+1555010{:04}", i),
                        Some(5.0 - i as f64 * 0.5),
                    )
                    .await,
            );
        }

        let clock = Arc::new(ManualClock::new(now()));
        let engine = Engine::new(store.clone(), store.clone(), clock);
        let state = Arc::new(ApiState {
            engine: engine.clone(),
            webhook_token: Some(WEBHOOK_TOKEN.to_string()),
        });
        let server = TestServer::new(router(state)).unwrap();

        Self {
            server,
            store,
            engine,
            club_id: club.club_id,
            players,
        }
    }

    pub fn player_id(&self, index: usize) -> Uuid {
        self.players[index].id
    }

    pub fn create_body(&self, seated: &[usize]) -> Value {
        json!({
            "club_id": self.club_id,
            "scheduled_at": now() + Duration::days(2),
            "originator_id": null,
            "player_ids": seated.iter().map(|i| self.player_id(*i)).collect::<Vec<_>>(),
        })
    }
}
