//! Phase Engine: round lifecycle and phase transitions.
//!
//! Every event (buzz, submit, vote, admin action, timer fire) is applied
//! while holding the session write lock, so no two events ever race against
//! the same `RoundInstance`.

use super::{ballot, AppState, Session};
use crate::clock;
use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::types::*;
use futures::future::{BoxFuture, FutureExt};
use std::time::Duration;

/// What caused a phase advance.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceTrigger {
    /// Scheduled expiry of the phase that was live when the timer was set.
    /// Carries the staleness token captured at scheduling time.
    Timer { round_id: RoundId, generation: u64 },
    /// Explicit admin action.
    Admin,
}

impl AppState {
    /// Start a new round from the registry template for `round_type`.
    ///
    /// Fails while a round is active and not yet in its terminal phase.
    pub async fn start_round(&self, round_type: RoundType) -> Result<RoundInstance, GameError> {
        let definition = self.registry.get(round_type)?.clone();

        let instance = {
            let mut session = self.session.write().await;
            if let Some(current) = &session.current {
                if !current.is_terminal() {
                    return Err(GameError::RoundInProgress(current.phase));
                }
            }
            session.generation_seq += 1;
            let instance = RoundInstance::new(definition, session.generation_seq, clock::now());
            session.current = Some(instance.clone());
            instance
        };

        tracing::info!(
            round = %instance.id,
            ?round_type,
            phase = ?instance.phase,
            "round started"
        );
        self.schedule_phase_timer(&instance).await;
        self.broadcast_state().await;
        Ok(instance)
    }

    /// Advance the active round to its next phase.
    ///
    /// Timer triggers are honored only if both the round id and the
    /// generation still match the live phase; otherwise the fire is stale
    /// and a no-op. Duplicate fires against an already-advanced phase are
    /// therefore idempotent, and a leftover timer from an earlier round can
    /// never touch a newer one.
    ///
    /// Returns a boxed future: the phase timer task awaits this function,
    /// which schedules the next timer task.
    pub fn advance_phase(&self, trigger: AdvanceTrigger) -> BoxFuture<'_, Result<(), GameError>> {
        async move {
            let snapshot = {
                let mut session = self.session.write().await;

                let Some(current) = session.current.as_ref() else {
                    return match trigger {
                        AdvanceTrigger::Timer { .. } => Ok(()),
                        AdvanceTrigger::Admin => Err(GameError::NoActiveRound),
                    };
                };

                if let AdvanceTrigger::Timer {
                    round_id,
                    generation,
                } = &trigger
                {
                    if current.id != *round_id || current.generation != *generation {
                        tracing::debug!(round = %round_id, generation, "stale phase timer ignored");
                        return Ok(());
                    }
                }

                if current.is_terminal() {
                    return match trigger {
                        AdvanceTrigger::Timer { .. } => Ok(()),
                        AdvanceTrigger::Admin => Err(GameError::InvalidState {
                            action: "advance",
                            phase: Phase::Ended,
                        }),
                    };
                }

                let phases = current.definition.phases();
                let position = phases
                    .iter()
                    .position(|s| s.phase == current.phase)
                    .expect("active phase is drawn from the definition");
                // A listening phase that expires without a buzz skips straight
                // to the end: there is no winner to lock in.
                let next = if current.phase == Phase::Listening
                    && matches!(trigger, AdvanceTrigger::Timer { .. })
                {
                    *phases.last().expect("phase list is never empty")
                } else {
                    phases[position + 1]
                };

                enter_phase(&mut session, next);
                if next.phase == Phase::Ended {
                    finish_round(&mut session);
                }
                session.current.clone().expect("round still active")
            };

            self.schedule_phase_timer(&snapshot).await;
            self.broadcast_state().await;
            Ok(())
        }
        .boxed()
    }

    /// Record a buzz during `Listening`. The first caller wins and locks the
    /// round; everyone after that lost the race, which is not a protocol
    /// failure.
    pub async fn record_buzz(&self, team_id: &str) -> Result<Team, GameError> {
        let (team, snapshot) = {
            let mut session = self.session.write().await;
            if !session.teams.contains_key(team_id) {
                return Err(GameError::UnknownTeam(team_id.to_string()));
            }
            let Some(current) = session.current.as_ref() else {
                return Err(GameError::NoActiveRound);
            };
            // Checked before the phase: the first buzz moves the round to
            // Locked, so late buzzes would otherwise only ever see a phase
            // mismatch.
            if current.buzz_winner.is_some() {
                return Err(GameError::DuplicateAction("buzz"));
            }
            if current.phase != Phase::Listening {
                return Err(GameError::InvalidState {
                    action: "buzz",
                    phase: current.phase,
                });
            }

            session.current.as_mut().expect("checked above").buzz_winner =
                Some(team_id.to_string());
            enter_phase(
                &mut session,
                PhaseSpec {
                    phase: Phase::Locked,
                    duration_secs: None,
                },
            );
            let team = session.teams.get(team_id).cloned().expect("checked above");
            (team, session.current.clone().expect("round still active"))
        };

        tracing::info!(round = %snapshot.id, team = %team.name, "buzz winner locked in");
        // Locked has no duration, so this just cancels the listening countdown.
        self.schedule_phase_timer(&snapshot).await;
        self.broadcast_to_all(ServerMessage::BuzzWinner {
            team_id: team.id.clone(),
            team_name: team.name.clone(),
        });
        self.broadcast_state().await;
        Ok(team)
    }

    /// (Re)arm the single pending phase timer for the given phase entry,
    /// aborting whatever was scheduled before. Phases without a duration end
    /// up with no timer at all.
    async fn schedule_phase_timer(&self, instance: &RoundInstance) {
        let handle = instance.phase_duration_secs.map(|secs| {
            let state = self.clone();
            let trigger = AdvanceTrigger::Timer {
                round_id: instance.id.clone(),
                generation: instance.generation,
            };
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                // Err here means the whole round is gone; stale fires against
                // a live round already return Ok.
                if let Err(e) = state.advance_phase(trigger).await {
                    tracing::debug!("expired phase timer dropped: {e}");
                }
            })
        });
        self.replace_phase_timer(instance.generation, handle).await;
    }
}

/// Enter `spec`, stamping the start time exactly once and bumping the
/// generation so any previously scheduled timer becomes stale.
fn enter_phase(session: &mut Session, spec: PhaseSpec) {
    if spec.phase == Phase::Voting {
        ballot::freeze_ballot(session);
    }
    session.generation_seq += 1;
    let generation = session.generation_seq;
    let current = session.current.as_mut().expect("active round");
    let from = current.phase;
    current.phase = spec.phase;
    current.phase_started_at = clock::now();
    current.phase_duration_secs = spec.duration_secs;
    current.generation = generation;
    tracing::info!(round = %current.id, ?from, to = ?spec.phase, "phase advanced");
}

/// Terminal-phase bookkeeping: record winners and, for vote rounds, award
/// the template's points to every tied winner.
fn finish_round(session: &mut Session) {
    let Some(current) = session.current.as_ref() else {
        return;
    };

    let vote_round = current.definition.is_vote_round();
    let points = current.definition.points;
    let winners: Vec<TeamId> = if vote_round {
        let owners = session
            .ballot_owners
            .get(&current.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        ballot::winning_teams(&current.votes, owners)
    } else {
        current.buzz_winner.clone().into_iter().collect()
    };

    if vote_round {
        for team_id in &winners {
            if let Some(team) = session.teams.get_mut(team_id) {
                team.points += points;
            }
        }
    }
    session.current.as_mut().expect("still active").winners = Some(winners);
}
