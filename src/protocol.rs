use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinTeam {
        name: String,
    },
    Buzz {
        team_id: TeamId,
    },
    Submit {
        team_id: TeamId,
        payload: SubmissionPayload,
    },
    Vote {
        team_id: TeamId,
        index: usize,
    },
    // Admin-only messages
    AdminStartRound {
        round_type: RoundType,
    },
    AdminAdvancePhase,
    AdminAwardPoints {
        team_id: TeamId,
        points: u32,
    },
    /// Private owner lookup: "who wrote the entry at this index?"
    AdminQueryBallotOwner {
        round_id: RoundId,
        index: usize,
    },
    AdminResetSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        state: PublicState,
        server_now: String,
    },
    /// Full public state, re-sent on every state-affecting event. A client
    /// that misses one is healed by the next.
    State {
        state: PublicState,
    },
    TeamJoined {
        team: Team,
    },
    /// Transient: announces the buzz race winner. Carries no state obligation.
    BuzzWinner {
        team_id: TeamId,
        team_name: String,
    },
    /// Transient: ack to the voting team only.
    VoteAck,
    /// Admin-only reply to `AdminQueryBallotOwner`.
    BallotOwner {
        round_id: RoundId,
        index: usize,
        team_id: TeamId,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// The whole broadcast state. Everything in here is safe for every client to
/// see; in particular the ballot and vote counts carry no team identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicState {
    pub teams: Vec<Team>,
    pub challenge: Option<ChallengeView>,
    pub room_code: String,
    pub server_now: String,
}

/// Public projection of the live round. Submission payloads appear only as
/// anonymized ballot entries after the freeze; the owner mapping stays
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeView {
    pub round_id: RoundId,
    pub round_type: RoundType,
    pub title: String,
    pub phase: Phase,
    pub phase_started_at: String,
    pub phase_duration_secs: Option<u64>,
    /// Convenience snapshot as of `server_now`; clients still derive their
    /// own countdown from `phase_started_at` + `phase_duration_secs`.
    pub remaining_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Revealed only once the round has ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub submission_count: usize,
    pub ballot: Option<Vec<BallotEntry>>,
    pub vote_counts: HashMap<usize, u32>,
    pub buzz_winner: Option<TeamId>,
    pub winners: Option<Vec<TeamId>>,
}
