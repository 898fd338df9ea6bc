use std::error::Error;
use courtcall_core::errors::{CourtError, CourtResult};
use courtcall_core::models::court_match::MatchStatus;
use uuid::Uuid;

#[test]
fn test_court_error_display() {
    let not_found = CourtError::NotFound("Match 7 not found".to_string());
    let validation = CourtError::Validation("Invalid input".to_string());
    let configuration = CourtError::Configuration("club has no phone number".to_string());
    let delivery = CourtError::Delivery("carrier rejected message".to_string());
    let database = CourtError::Database(eyre::eyre!("Database connection failed"));

    assert_eq!(not_found.to_string(), "Resource not found: Match 7 not found");
    assert_eq!(validation.to_string(), "Validation error: Invalid input");
    assert_eq!(
        configuration.to_string(),
        "Configuration error: club has no phone number"
    );
    assert_eq!(delivery.to_string(), "Delivery error: carrier rejected message");
    assert!(database.to_string().contains("Database error:"));
}

#[test]
fn test_duplicate_invite_names_both_ids() {
    let match_id = Uuid::new_v4();
    let player_id = Uuid::new_v4();
    let error = CourtError::DuplicateActiveInvite { match_id, player_id };

    let message = error.to_string();
    assert!(message.contains(&match_id.to_string()));
    assert!(message.contains(&player_id.to_string()));
}

#[test]
fn test_match_closed_shows_status() {
    let error = CourtError::MatchClosed {
        match_id: Uuid::new_v4(),
        status: MatchStatus::Cancelled,
    };

    assert!(error.to_string().contains("is cancelled"));
}

#[test]
fn test_internal_error_keeps_source() {
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "IO error");
    let court_error = CourtError::Internal(Box::new(io_error));

    assert!(court_error.source().is_some());
    assert!(court_error.to_string().contains("IO error"));
}

#[test]
fn test_court_result() {
    let result: CourtResult<i32> = Ok(42);
    assert_eq!(result.unwrap(), 42);

    let result: CourtResult<i32> = Err(CourtError::NotFound("Not found".to_string()));
    assert!(result.is_err());
}
