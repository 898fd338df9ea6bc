//! # CourtCall Core
//!
//! Pure domain logic for the SMS match-invite engine: the data model, the
//! inbound command grammar, the quiet-hours gate and the per-match invite
//! ledger. Nothing in this crate performs I/O; storage and ranking are
//! described as traits in [`store`] and implemented elsewhere.

pub mod clock;
pub mod command;
pub mod errors;
pub mod ledger;
pub mod models;
pub mod quiet_hours;
pub mod store;
