use courtcall_sms::config::SmsConfig;
use courtcall_sms::gateway::{GatewayError, LogGateway, SmsGateway, classify_status};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use rstest::rstest;

#[test]
fn test_default_config() {
    let config = SmsConfig::default();

    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.backoff_base_seconds, 30);
    assert_eq!(config.poll_interval_seconds, 5);
    assert_eq!(config.batch_limit, 50);
    assert_eq!(config.feedback_sweep_interval_seconds, 60);
    assert!(config.gateway_credentials().is_none());
}

#[test]
fn test_gateway_credentials_need_all_three_values() {
    let partial = SmsConfig {
        gateway_url: Some("https://api.twilio.com/2010-04-01".to_string()),
        account_sid: Some("AC123".to_string()),
        ..SmsConfig::default()
    };
    assert!(partial.gateway_credentials().is_none());

    let full = SmsConfig {
        auth_token: Some("secret".to_string()),
        ..partial
    };
    assert_eq!(
        full.gateway_credentials(),
        Some(("https://api.twilio.com/2010-04-01", "AC123", "secret"))
    );
}

#[rstest]
#[case::no_attempts(SmsConfig { max_attempts: 0, ..SmsConfig::default() }, "SMS_MAX_ATTEMPTS")]
#[case::zero_poll(SmsConfig { poll_interval_seconds: 0, ..SmsConfig::default() }, "SMS_POLL_INTERVAL_SECONDS")]
#[case::zero_sweep(
    SmsConfig { feedback_sweep_interval_seconds: 0, ..SmsConfig::default() },
    "FEEDBACK_SWEEP_INTERVAL_SECONDS"
)]
#[case::empty_batch(SmsConfig { batch_limit: 0, ..SmsConfig::default() }, "SMS_BATCH_LIMIT")]
fn test_validate_rejects_zero_values(#[case] config: SmsConfig, #[case] variable: &str) {
    let error = config.validate().unwrap_err();

    assert!(error.to_string().contains(variable));
}

#[test]
fn test_default_config_is_valid() {
    assert!(SmsConfig::default().validate().is_ok());
}

#[rstest]
#[case(StatusCode::INTERNAL_SERVER_ERROR, true)]
#[case(StatusCode::BAD_GATEWAY, true)]
#[case(StatusCode::SERVICE_UNAVAILABLE, true)]
#[case(StatusCode::TOO_MANY_REQUESTS, true)]
#[case(StatusCode::BAD_REQUEST, false)]
#[case(StatusCode::UNAUTHORIZED, false)]
#[case(StatusCode::NOT_FOUND, false)]
fn test_classify_status(#[case] status: StatusCode, #[case] transient: bool) {
    let error = classify_status(status, "carrier said no".to_string());

    assert_eq!(matches!(error, GatewayError::Transient(_)), transient);
    assert!(error.to_string().contains("carrier said no"));
}

#[tokio::test]
async fn test_log_gateway_always_accepts() {
    let sid = LogGateway
        .send("+15550000000", "+15550100000", "hello")
        .await
        .unwrap();

    assert!(sid.starts_with("log-"));
}
