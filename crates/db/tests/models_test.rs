use chrono::{TimeZone, Utc};
use courtcall_core::errors::CourtError;
use courtcall_core::models::club::ClubMessagingConfig;
use courtcall_core::models::court_match::{CourtMatch, MatchStatus};
use courtcall_db::models::{DbClub, DbMatch};
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

fn db_club(start: Option<i32>, end: Option<i32>) -> DbClub {
    DbClub {
        id: Uuid::new_v4(),
        name: "Harbour Club".to_string(),
        phone_number: Some("+15550001111".to_string()),
        timezone: "Europe/Madrid".to_string(),
        quiet_hours_start: start,
        quiet_hours_end: end,
        initial_batch_size: 3,
        invite_timeout_minutes: 15,
        feedback_delay_hours: 2,
        feedback_reminder_delay_hours: 24,
        sms_test_mode: true,
        sms_whitelist: vec!["+15550002222".to_string()],
        created_at: Utc::now(),
    }
}

#[test]
fn test_club_row_converts_to_config() {
    let config = ClubMessagingConfig::from(db_club(Some(21), Some(8)));

    assert_eq!(config.quiet_hours_start, Some(21));
    assert_eq!(config.initial_batch_size, 3);
    assert_eq!(config.invite_timeout_minutes, 15);
    assert!(config.allows_recipient("+15550002222"));
    assert!(!config.allows_recipient("+15550003333"));
    config.validate().unwrap();
}

#[rstest]
#[case(Some(-1), Some(8))]
#[case(Some(21), Some(24))]
#[case(Some(21), None)]
fn test_bad_quiet_hours_surface_as_configuration_errors(
    #[case] start: Option<i32>,
    #[case] end: Option<i32>,
) {
    let config = ClubMessagingConfig::from(db_club(start, end));
    assert!(matches!(config.validate(), Err(CourtError::Configuration(_))));
}

#[test]
fn test_match_row_with_unknown_status_is_rejected() {
    let row = DbMatch {
        id: Uuid::new_v4(),
        club_id: Uuid::new_v4(),
        number: 7,
        scheduled_at: Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
        status: "confirmed".to_string(),
        team1: vec![Uuid::new_v4()],
        team2: vec![],
        originator_id: None,
        score: None,
        version: 3,
        created_at: Utc::now(),
    };

    let court_match = CourtMatch::try_from(row.clone()).unwrap();
    assert_eq!(court_match.status, MatchStatus::Confirmed);
    assert_eq!(court_match.version, 3);

    let broken = DbMatch {
        status: "postponed".to_string(),
        ..row
    };
    assert!(CourtMatch::try_from(broken).is_err());
}
