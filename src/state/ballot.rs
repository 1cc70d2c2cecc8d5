//! Submission/Vote Aggregator: collects per-team contributions and turns
//! them into the anonymized ballot shown during voting.
//!
//! Duplicate policy (uniform across round types): the last submission or
//! vote before the phase deadline wins.

use super::{AppState, Session};
use crate::error::GameError;
use crate::types::*;
use rand::seq::SliceRandom;
use std::collections::HashMap;

impl AppState {
    /// Store a team's submission for the active round. Valid only during the
    /// round's submission phase, and the payload kind must match the round
    /// type (text for writing, photo reference for creation).
    pub async fn submit(
        &self,
        team_id: &str,
        payload: SubmissionPayload,
    ) -> Result<(), GameError> {
        {
            let mut session = self.session.write().await;
            if !session.teams.contains_key(team_id) {
                return Err(GameError::UnknownTeam(team_id.to_string()));
            }
            let Some(current) = session.current.as_ref() else {
                return Err(GameError::NoActiveRound);
            };
            if current.definition.submission_phase() != Some(current.phase) {
                return Err(GameError::InvalidState {
                    action: "submit",
                    phase: current.phase,
                });
            }
            let kind_matches = matches!(
                (&current.definition.content, &payload),
                (RoundContent::Writing { .. }, SubmissionPayload::Text { .. })
                    | (RoundContent::Creation { .. }, SubmissionPayload::Photo { .. })
            );
            if !kind_matches {
                return Err(GameError::InvalidState {
                    action: "submit",
                    phase: current.phase,
                });
            }

            let current = session.current.as_mut().expect("checked above");
            if current
                .submissions
                .insert(team_id.to_string(), payload)
                .is_some()
            {
                tracing::debug!(team = %team_id, "submission replaced");
            }
        }

        self.broadcast_state().await;
        Ok(())
    }

    /// Record a team's vote for a ballot index. Self-votes are rejected; a
    /// repeat vote overwrites the earlier one.
    pub async fn vote(&self, team_id: &str, index: usize) -> Result<(), GameError> {
        {
            let mut session = self.session.write().await;
            if !session.teams.contains_key(team_id) {
                return Err(GameError::UnknownTeam(team_id.to_string()));
            }
            let Some(current) = session.current.as_ref() else {
                return Err(GameError::NoActiveRound);
            };
            if current.phase != Phase::Voting {
                return Err(GameError::InvalidState {
                    action: "vote",
                    phase: current.phase,
                });
            }
            let ballot_len = current.ballot.as_ref().map(Vec::len).unwrap_or(0);
            if index >= ballot_len {
                return Err(GameError::IndexOutOfRange(index));
            }
            let own_entry = session
                .ballot_owners
                .get(&current.id)
                .and_then(|owners| owners.get(index))
                .is_some_and(|owner| owner == team_id);
            if own_entry {
                return Err(GameError::SelfVote);
            }

            session
                .current
                .as_mut()
                .expect("checked above")
                .votes
                .insert(team_id.to_string(), index);
        }

        self.broadcast_state().await;
        Ok(())
    }

    /// Admin-only lookup of the private owner mapping.
    pub async fn ballot_owner(&self, round_id: &str, index: usize) -> Result<TeamId, GameError> {
        let session = self.session.read().await;
        session
            .ballot_owners
            .get(round_id)
            .and_then(|owners| owners.get(index))
            .cloned()
            .ok_or_else(|| GameError::OwnerLookupMiss {
                round_id: round_id.to_string(),
                index,
            })
    }
}

/// Freeze the collected submissions into the anonymized public ballot,
/// retaining the owner mapping in the private side table. Called exactly
/// once, at the submission-phase -> voting transition; a repeat call is a
/// no-op.
pub(super) fn freeze_ballot(session: &mut Session) {
    let Some(current) = session.current.as_mut() else {
        return;
    };
    if current.ballot.is_some() {
        return;
    }

    let mut entries: Vec<(TeamId, SubmissionPayload)> = current
        .submissions
        .iter()
        .map(|(team_id, payload)| (team_id.clone(), payload.clone()))
        .collect();
    // Sort first so the shuffle is the only source of ordering, not map
    // iteration order.
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.shuffle(&mut rand::rng());

    let mut owners = Vec::with_capacity(entries.len());
    let mut ballot = Vec::with_capacity(entries.len());
    for (index, (team_id, payload)) in entries.into_iter().enumerate() {
        owners.push(team_id);
        ballot.push(BallotEntry { index, payload });
    }

    tracing::info!(round = %current.id, entries = ballot.len(), "ballot frozen");
    current.ballot = Some(ballot);
    let round_id = current.id.clone();
    session.ballot_owners.insert(round_id, owners);
}

/// Vote counts per ballot index.
pub(crate) fn tally(votes: &HashMap<TeamId, usize>) -> HashMap<usize, u32> {
    let mut counts: HashMap<usize, u32> = HashMap::new();
    for index in votes.values() {
        *counts.entry(*index).or_insert(0) += 1;
    }
    counts
}

/// All teams tied for the highest vote count, in ballot order. Ties are all
/// reported, never broken.
pub(super) fn winning_teams(votes: &HashMap<TeamId, usize>, owners: &[TeamId]) -> Vec<TeamId> {
    let counts = tally(votes);
    let Some(max) = counts.values().copied().max() else {
        return Vec::new();
    };
    let mut winning_indices: Vec<usize> = counts
        .into_iter()
        .filter(|(_, count)| *count == max)
        .map(|(index, _)| index)
        .collect();
    winning_indices.sort_unstable();
    winning_indices
        .into_iter()
        .filter_map(|index| owners.get(index).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AdvanceTrigger;

    fn text(s: &str) -> SubmissionPayload {
        SubmissionPayload::Text {
            text: s.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_outside_submission_phase_is_rejected() {
        let state = AppState::new();
        let team = state.join_team("Red").await.unwrap();
        state.start_round(RoundType::BuzzRace).await.unwrap();

        let result = state.submit(&team.id, text("too early")).await;
        assert_eq!(
            result,
            Err(GameError::InvalidState {
                action: "submit",
                phase: Phase::Listening
            })
        );
    }

    #[tokio::test]
    async fn test_submit_wrong_payload_kind_is_rejected() {
        let state = AppState::new();
        let team = state.join_team("Red").await.unwrap();
        state.start_round(RoundType::Writing).await.unwrap();

        let result = state
            .submit(
                &team.id,
                SubmissionPayload::Photo {
                    url: "/uploads/x.jpg".to_string(),
                },
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_repeat_submission_overwrites() {
        let state = AppState::new();
        let team = state.join_team("Red").await.unwrap();
        state.start_round(RoundType::Writing).await.unwrap();

        state.submit(&team.id, text("first draft")).await.unwrap();
        state.submit(&team.id, text("final answer")).await.unwrap();

        let session = state.session.read().await;
        let current = session.current.as_ref().unwrap();
        assert_eq!(current.submissions.len(), 1);
        assert_eq!(current.submissions[&team.id], text("final answer"));
    }

    #[tokio::test]
    async fn test_freeze_ballot_hides_owners_and_happens_once() {
        let state = AppState::new();
        let a = state.join_team("A").await.unwrap();
        let b = state.join_team("B").await.unwrap();
        state.start_round(RoundType::Writing).await.unwrap();
        state.submit(&a.id, text("Hello")).await.unwrap();
        state.submit(&b.id, text("World")).await.unwrap();

        state.advance_phase(AdvanceTrigger::Admin).await.unwrap();

        let session = state.session.read().await;
        let current = session.current.as_ref().unwrap();
        let ballot = current.ballot.as_ref().unwrap();
        assert_eq!(ballot.len(), 2);
        assert_eq!(ballot[0].index, 0);
        assert_eq!(ballot[1].index, 1);

        let owners = &session.ballot_owners[&current.id];
        assert_eq!(owners.len(), 2);
        assert!(owners.contains(&a.id) && owners.contains(&b.id));
        // Entry at index i belongs to owners[i].
        for entry in ballot {
            let expected = if owners[entry.index] == a.id {
                text("Hello")
            } else {
                text("World")
            };
            assert_eq!(entry.payload, expected);
        }
        drop(session);

        // Freezing again must not reshuffle.
        let mut session = state.session.write().await;
        let before = session.current.as_ref().unwrap().ballot.clone();
        freeze_ballot(&mut session);
        assert_eq!(session.current.as_ref().unwrap().ballot, before);
    }

    #[tokio::test]
    async fn test_vote_rejects_self_vote() {
        let state = AppState::new();
        let a = state.join_team("A").await.unwrap();
        let b = state.join_team("B").await.unwrap();
        state.start_round(RoundType::Writing).await.unwrap();
        state.submit(&a.id, text("Hello")).await.unwrap();
        state.submit(&b.id, text("World")).await.unwrap();
        state.advance_phase(AdvanceTrigger::Admin).await.unwrap();

        let own_index = {
            let session = state.session.read().await;
            let current = session.current.as_ref().unwrap();
            let owners = &session.ballot_owners[&current.id];
            owners.iter().position(|o| *o == a.id).unwrap()
        };

        assert_eq!(state.vote(&a.id, own_index).await, Err(GameError::SelfVote));
        let session = state.session.read().await;
        assert!(session.current.as_ref().unwrap().votes.is_empty());
    }

    #[tokio::test]
    async fn test_vote_rejects_out_of_range_index() {
        let state = AppState::new();
        let a = state.join_team("A").await.unwrap();
        let b = state.join_team("B").await.unwrap();
        state.start_round(RoundType::Writing).await.unwrap();
        state.submit(&a.id, text("Hello")).await.unwrap();
        state.submit(&b.id, text("World")).await.unwrap();
        state.advance_phase(AdvanceTrigger::Admin).await.unwrap();

        assert_eq!(
            state.vote(&a.id, 5).await,
            Err(GameError::IndexOutOfRange(5))
        );
    }

    #[tokio::test]
    async fn test_repeat_vote_overwrites() {
        let state = AppState::new();
        let a = state.join_team("A").await.unwrap();
        let b = state.join_team("B").await.unwrap();
        let c = state.join_team("C").await.unwrap();
        state.start_round(RoundType::Writing).await.unwrap();
        for (team, card) in [(&a, "one"), (&b, "two"), (&c, "three")] {
            state.submit(&team.id, text(card)).await.unwrap();
        }
        state.advance_phase(AdvanceTrigger::Admin).await.unwrap();

        let owners = {
            let session = state.session.read().await;
            let current = session.current.as_ref().unwrap();
            session.ballot_owners[&current.id].clone()
        };
        let index_of = |id: &str| owners.iter().position(|o| o == id).unwrap();

        state.vote(&a.id, index_of(&b.id)).await.unwrap();
        state.vote(&a.id, index_of(&c.id)).await.unwrap();

        let session = state.session.read().await;
        let votes = &session.current.as_ref().unwrap().votes;
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[&a.id], index_of(&c.id));
    }

    #[tokio::test]
    async fn test_ballot_owner_lookup_miss() {
        let state = AppState::new();
        let result = state.ballot_owner("no-such-round", 0).await;
        assert_eq!(
            result,
            Err(GameError::OwnerLookupMiss {
                round_id: "no-such-round".to_string(),
                index: 0
            })
        );
    }

    #[test]
    fn test_tally_counts_per_index() {
        let mut votes = HashMap::new();
        votes.insert("t1".to_string(), 0);
        votes.insert("t2".to_string(), 0);
        votes.insert("t3".to_string(), 2);
        let counts = tally(&votes);
        assert_eq!(counts.get(&0), Some(&2));
        assert_eq!(counts.get(&2), Some(&1));
        assert_eq!(counts.get(&1), None);
    }

    #[test]
    fn test_winning_teams_reports_all_ties() {
        let owners = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let mut votes = HashMap::new();
        // A:2, B:2, C:1
        votes.insert("v1".to_string(), 0);
        votes.insert("v2".to_string(), 0);
        votes.insert("v3".to_string(), 1);
        votes.insert("v4".to_string(), 1);
        votes.insert("v5".to_string(), 2);

        let winners = winning_teams(&votes, &owners);
        assert_eq!(winners, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_winning_teams_empty_without_votes() {
        let owners = vec!["A".to_string()];
        assert!(winning_teams(&HashMap::new(), &owners).is_empty());
    }
}
