//! WebSocket message dispatch
//!
//! Authorization for admin commands is checked here; per-event rejections
//! follow the drop policy: out-of-phase or duplicate game events are logged
//! and swallowed (a late network message must never rattle other teams),
//! while admin mistakes and join conflicts are answered with an `Error`.

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AdvanceTrigger, AppState};
use crate::types::Role;

/// Macro to check admin authorization and return early if unauthorized
macro_rules! check_admin {
    ($role:expr, $action:expr) => {
        if *$role != Role::Admin {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only the admin can {}", $action),
            });
        }
    };
}

fn error_reply(e: GameError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    state: &AppState,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::JoinTeam { name } => match state.join_team(&name).await {
            Ok(team) => Some(ServerMessage::TeamJoined { team }),
            Err(e) => Some(error_reply(e)),
        },

        ClientMessage::Buzz { team_id } => match state.record_buzz(&team_id).await {
            Ok(_) => None,
            // Losing the race or buzzing out of phase is a human outcome,
            // not a protocol error.
            Err(e) => {
                tracing::debug!("buzz dropped: {e}");
                None
            }
        },

        ClientMessage::Submit { team_id, payload } => {
            match state.submit(&team_id, payload).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::debug!("submission dropped: {e}");
                    None
                }
            }
        }

        ClientMessage::Vote { team_id, index } => match state.vote(&team_id, index).await {
            Ok(()) => Some(ServerMessage::VoteAck),
            Err(e) => {
                tracing::debug!("vote dropped: {e}");
                None
            }
        },

        // Admin-only commands (authorization checked before dispatch)
        ClientMessage::AdminStartRound { round_type } => {
            check_admin!(role, "start rounds");
            match state.start_round(round_type).await {
                Ok(_) => None,
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::AdminAdvancePhase => {
            check_admin!(role, "advance phases");
            match state.advance_phase(AdvanceTrigger::Admin).await {
                Ok(()) => None,
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::AdminAwardPoints { team_id, points } => {
            check_admin!(role, "award points");
            match state.award_points(&team_id, points).await {
                Ok(_) => None,
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::AdminQueryBallotOwner { round_id, index } => {
            check_admin!(role, "look up ballot owners");
            match state.ballot_owner(&round_id, index).await {
                Ok(team_id) => Some(ServerMessage::BallotOwner {
                    round_id,
                    index,
                    team_id,
                }),
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::AdminResetSession => {
            check_admin!(role, "reset the session");
            state.reset_session().await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoundType;

    #[tokio::test]
    async fn test_unauthorized_admin_command() {
        let state = AppState::new();
        let role = Role::Team;

        let result = handle_message(
            ClientMessage::AdminStartRound {
                round_type: RoundType::Quiz,
            },
            &role,
            &state,
        )
        .await;

        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "UNAUTHORIZED"),
            other => panic!("Expected UNAUTHORIZED error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_join_conflict_is_reported_to_sender() {
        let state = AppState::new();
        let role = Role::Team;

        let _ = handle_message(
            ClientMessage::JoinTeam {
                name: "Red".to_string(),
            },
            &role,
            &state,
        )
        .await;

        let result = handle_message(
            ClientMessage::JoinTeam {
                name: "red".to_string(),
            },
            &role,
            &state,
        )
        .await;
        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "NAME_TAKEN"),
            other => panic!("Expected NAME_TAKEN error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_phase_vote_is_silently_dropped() {
        let state = AppState::new();
        let team = state.join_team("Red").await.unwrap();
        state.start_round(RoundType::Writing).await.unwrap();

        let result = handle_message(
            ClientMessage::Vote {
                team_id: team.id,
                index: 0,
            },
            &Role::Team,
            &state,
        )
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_round_type_reported_to_admin() {
        let state = AppState::with_registry(crate::registry::RoundRegistry::new(vec![]));

        let result = handle_message(
            ClientMessage::AdminStartRound {
                round_type: RoundType::BuzzRace,
            },
            &Role::Admin,
            &state,
        )
        .await;
        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "UNKNOWN_ROUND_TYPE"),
            other => panic!("Expected UNKNOWN_ROUND_TYPE error, got {other:?}"),
        }
    }
}
