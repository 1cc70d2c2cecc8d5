use crate::types::{Phase, RoundId, RoundType};
use thiserror::Error;

/// Everything that can go wrong while applying a client event.
///
/// All of these are local and non-fatal: a bad event is dropped (or answered
/// with an `Error` message where the sender needs to know), and the next
/// full-state broadcast keeps every client consistent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("{action} is not valid during {phase:?}")]
    InvalidState { action: &'static str, phase: Phase },

    #[error("duplicate {0} ignored")]
    DuplicateAction(&'static str),

    #[error("no round template registered for {0:?}")]
    UnknownRoundType(RoundType),

    #[error("no ballot owner recorded for round {round_id} index {index}")]
    OwnerLookupMiss { round_id: RoundId, index: usize },

    #[error("a round is already active in phase {0:?}")]
    RoundInProgress(Phase),

    #[error("no active round")]
    NoActiveRound,

    #[error("team name {0:?} is already taken")]
    NameTaken(String),

    #[error("team name cannot be empty")]
    EmptyTeamName,

    #[error("unknown team {0}")]
    UnknownTeam(String),

    #[error("ballot index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("a team cannot vote for its own entry")]
    SelfVote,
}

impl GameError {
    /// Stable machine-readable code for the wire-level `Error` message.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidState { .. } => "INVALID_STATE",
            GameError::DuplicateAction(_) => "DUPLICATE_ACTION",
            GameError::UnknownRoundType(_) => "UNKNOWN_ROUND_TYPE",
            GameError::OwnerLookupMiss { .. } => "OWNER_LOOKUP_MISS",
            GameError::RoundInProgress(_) => "ROUND_IN_PROGRESS",
            GameError::NoActiveRound => "NO_ACTIVE_ROUND",
            GameError::NameTaken(_) => "NAME_TAKEN",
            GameError::EmptyTeamName => "INVALID_NAME",
            GameError::UnknownTeam(_) => "UNKNOWN_TEAM",
            GameError::IndexOutOfRange(_) => "INDEX_OUT_OF_RANGE",
            GameError::SelfVote => "SELF_VOTE",
        }
    }
}
