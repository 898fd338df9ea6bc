use thiserror::Error;
use uuid::Uuid;

use crate::models::court_match::MatchStatus;

#[derive(Error, Debug)]
pub enum CourtError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Player {player_id} already has an active invite for match {match_id}")]
    DuplicateActiveInvite { match_id: Uuid, player_id: Uuid },

    #[error("Match {match_id} is {status} and no longer accepts changes")]
    MatchClosed { match_id: Uuid, status: MatchStatus },

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type CourtResult<T> = Result<T, CourtError>;
