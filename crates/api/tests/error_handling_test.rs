use axum::http::StatusCode;
use courtcall_api::middleware::auth::verify_webhook_token;
use courtcall_api::middleware::error_handling::map_error;
use courtcall_core::errors::CourtError;
use courtcall_core::models::court_match::MatchStatus;
use rstest::rstest;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

#[rstest]
#[case(CourtError::NotFound("match".into()), StatusCode::NOT_FOUND)]
#[case(CourtError::Validation("bad".into()), StatusCode::BAD_REQUEST)]
#[case(CourtError::Authentication("token".into()), StatusCode::UNAUTHORIZED)]
#[case(
    CourtError::DuplicateActiveInvite { match_id: Uuid::nil(), player_id: Uuid::nil() },
    StatusCode::CONFLICT
)]
#[case(
    CourtError::MatchClosed { match_id: Uuid::nil(), status: MatchStatus::Cancelled },
    StatusCode::CONFLICT
)]
#[case(CourtError::Configuration("no phone".into()), StatusCode::UNPROCESSABLE_ENTITY)]
#[case(CourtError::Delivery("carrier".into()), StatusCode::INTERNAL_SERVER_ERROR)]
#[case(CourtError::Database(eyre::eyre!("connection reset")), StatusCode::INTERNAL_SERVER_ERROR)]
fn test_error_status_mapping(#[case] error: CourtError, #[case] expected: StatusCode) {
    assert_eq!(map_error(error).status(), expected);
}

#[test]
fn test_webhook_token_check() {
    assert_ok!(verify_webhook_token(None, None));
    assert_ok!(verify_webhook_token(None, Some("anything")));
    assert_ok!(verify_webhook_token(Some("s3cret"), Some("s3cret")));
    assert_err!(verify_webhook_token(Some("s3cret"), Some("s3cre")));
    assert_err!(verify_webhook_token(Some("s3cret"), None));
}
