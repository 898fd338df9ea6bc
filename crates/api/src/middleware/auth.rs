//! # Webhook Authentication
//!
//! The carrier is configured with a webhook URL that carries a shared secret
//! as `?token=`. Requests without the right token are rejected before any
//! text is parsed.

use courtcall_core::errors::{CourtError, CourtResult};

/// Checks `provided` against the configured token. With no token configured
/// every request is accepted.
///
/// # Example
///
/// ```
/// use courtcall_api::middleware::auth::verify_webhook_token;
///
/// assert!(verify_webhook_token(Some("s3cret"), Some("s3cret")).is_ok());
/// assert!(verify_webhook_token(Some("s3cret"), Some("guess")).is_err());
/// assert!(verify_webhook_token(None, None).is_ok());
/// ```
pub fn verify_webhook_token(expected: Option<&str>, provided: Option<&str>) -> CourtResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
        Some(_) => Err(CourtError::Authentication("invalid webhook token".to_string())),
        None => Err(CourtError::Authentication("missing webhook token".to_string())),
    }
}

// Compares every byte so timing does not reveal the matching prefix.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
