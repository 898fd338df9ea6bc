pub mod matches;
pub mod outbox;
pub mod sms;
