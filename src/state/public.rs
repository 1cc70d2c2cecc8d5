//! Projection of the authoritative session into the broadcast `PublicState`.
//!
//! This is the only path state takes to clients, so the owner-hiding
//! invariant lives here: nothing derived from `submissions`, `votes` or the
//! owner side table carries a team identity.

use super::AppState;
use crate::clock;
use crate::protocol::{ChallengeView, PublicState, ServerMessage};
use crate::state::ballot;
use crate::types::*;

impl AppState {
    pub async fn public_state(&self) -> PublicState {
        let session = self.session.read().await;
        let mut teams: Vec<Team> = session.teams.values().cloned().collect();
        teams.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));

        PublicState {
            teams,
            challenge: session.current.as_ref().map(ChallengeView::from),
            room_code: session.room_code.clone(),
            server_now: clock::now().to_rfc3339(),
        }
    }

    /// Push the full public state to every connected client.
    pub async fn broadcast_state(&self) {
        let state = self.public_state().await;
        self.broadcast_to_all(ServerMessage::State { state });
    }
}

impl From<&RoundInstance> for ChallengeView {
    fn from(round: &RoundInstance) -> Self {
        let (prompt, media_url, answer) = match &round.definition.content {
            RoundContent::BuzzRace {
                audio_url, answer, ..
            } => (None, Some(audio_url.clone()), Some(answer.clone())),
            RoundContent::Writing { prompt, .. } => (Some(prompt.clone()), None, None),
            RoundContent::Creation { prompt, .. } => (Some(prompt.clone()), None, None),
            RoundContent::Quiz { question, answer } => {
                (Some(question.clone()), None, Some(answer.clone()))
            }
        };

        Self {
            round_id: round.id.clone(),
            round_type: round.definition.round_type(),
            title: round.definition.title.clone(),
            phase: round.phase,
            phase_started_at: round.phase_started_at.to_rfc3339(),
            phase_duration_secs: round.phase_duration_secs,
            remaining_secs: round
                .phase_duration_secs
                .map(|secs| clock::remaining_secs(round.phase_started_at, secs, clock::now())),
            prompt,
            media_url,
            // The answer only becomes public once the round is over.
            answer: answer.filter(|_| round.is_terminal()),
            submission_count: round.submissions.len(),
            ballot: round.ballot.clone(),
            vote_counts: ballot::tally(&round.votes),
            buzz_winner: round.buzz_winner.clone(),
            winners: round.winners.clone(),
        }
    }
}
