use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use courtcall_core::errors::CourtError;
use courtcall_core::models::club::{ClubMessagingConfig, QuietHours};
use courtcall_core::quiet_hours::{defer_until_for_club, should_defer_until};
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

fn club(timezone: &str, start: Option<u32>, end: Option<u32>) -> ClubMessagingConfig {
    ClubMessagingConfig {
        club_id: Uuid::new_v4(),
        name: "Riverside Padel".to_string(),
        phone_number: Some("+15550000000".to_string()),
        timezone: timezone.to_string(),
        quiet_hours_start: start,
        quiet_hours_end: end,
        initial_batch_size: 3,
        invite_timeout_minutes: 15,
        feedback_delay_hours: 2,
        feedback_reminder_delay_hours: 24,
        sms_test_mode: false,
        sms_whitelist: vec![],
    }
}

#[rstest]
#[case(22, Some((2024, 5, 11, 8)))]
#[case(21, Some((2024, 5, 11, 8)))]
#[case(23, Some((2024, 5, 11, 8)))]
#[case(20, None)]
#[case(8, None)]
#[case(12, None)]
fn test_wrapping_window_evening(#[case] hour: u32, #[case] expected: Option<(i32, u32, u32, u32)>) {
    let window = QuietHours::new(21, 8).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 10, hour, 0, 0).unwrap();

    let deferred = should_defer_until(&window, &now);

    let expected = expected.map(|(y, m, d, h)| Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap());
    assert_eq!(deferred, expected);
}

#[test]
fn test_wrapping_window_after_midnight_ends_same_day() {
    let window = QuietHours::new(21, 8).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 11, 3, 30, 0).unwrap();

    assert_eq!(
        should_defer_until(&window, &now),
        Some(Utc.with_ymd_and_hms(2024, 5, 11, 8, 0, 0).unwrap())
    );
}

#[test]
fn test_daytime_window_does_not_wrap() {
    let window = QuietHours::new(12, 14).unwrap();
    let inside = Utc.with_ymd_and_hms(2024, 5, 10, 13, 59, 0).unwrap();
    let at_end = Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap();

    assert_eq!(
        should_defer_until(&window, &inside),
        Some(Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap())
    );
    assert_eq!(should_defer_until(&window, &at_end), None);
}

#[test]
fn test_equal_bounds_disable_window() {
    let window = QuietHours::new(9, 9).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();

    assert!(window.is_disabled());
    assert_eq!(should_defer_until(&window, &now), None);
}

#[test]
fn test_out_of_range_hours_are_configuration_errors() {
    assert!(matches!(
        QuietHours::new(24, 8),
        Err(CourtError::Configuration(_))
    ));
}

#[test]
fn test_club_gate_uses_club_timezone() {
    // 21:00 UTC is 23:00 in Madrid during summer time.
    let config = club("Europe/Madrid", Some(22), Some(8));
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 21, 0, 0).unwrap();

    let deferred = defer_until_for_club(&config, now).unwrap();

    // 08:00 Madrid on 2 July is 06:00 UTC.
    assert_eq!(deferred, Some(Utc.with_ymd_and_hms(2024, 7, 2, 6, 0, 0).unwrap()));
}

#[test]
fn test_club_without_quiet_hours_never_defers() {
    let config = club("UTC", None, None);
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 3, 0, 0).unwrap();

    assert_eq!(defer_until_for_club(&config, now).unwrap(), None);
}

#[test]
fn test_half_configured_window_is_rejected() {
    let config = club("UTC", Some(21), None);
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 3, 0, 0).unwrap();

    assert!(matches!(
        defer_until_for_club(&config, now),
        Err(CourtError::Configuration(_))
    ));
}

#[test]
fn test_boundary_inside_dst_gap_moves_forward() {
    // Clocks in New York jump from 02:00 to 03:00 on 10 March 2024.
    let tz: Tz = "America/New_York".parse().unwrap();
    let window = QuietHours::new(22, 2).unwrap();
    let now = tz.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap();

    let deferred = should_defer_until(&window, &now).unwrap();

    assert_eq!(deferred, tz.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap());
}
