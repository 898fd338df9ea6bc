pub mod club;
pub mod court_match;
pub mod feedback;
pub mod invite;
pub mod outbox;
