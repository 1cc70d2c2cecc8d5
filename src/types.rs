use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type TeamId = String;
pub type RoundId = String;

/// A team playing the session. Created on join, never deleted mid-session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Listening,
    Locked,
    Writing,
    Creating,
    Voting,
    Showing,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    BuzzRace,
    Writing,
    Creation,
    Quiz,
}

/// A named stage within a round. `duration_secs = None` means the phase ends
/// only on a qualifying event (buzz, admin advance), never on a timer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub duration_secs: Option<u64>,
}

/// Immutable round template. Loaded into the registry once, shared by every
/// instance of the same type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundDefinition {
    pub title: String,
    /// Points awarded per winning team.
    pub points: u32,
    #[serde(flatten)]
    pub content: RoundContent,
}

/// Type-specific round content. The engine only ever looks at the shared
/// phase-sequence contract (`RoundDefinition::phases`), never at these fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundContent {
    BuzzRace {
        audio_url: String,
        answer: String,
        listen_secs: u64,
    },
    Writing {
        prompt: String,
        writing_secs: u64,
        voting_secs: u64,
    },
    Creation {
        prompt: String,
        creating_secs: u64,
        voting_secs: u64,
    },
    Quiz {
        question: String,
        answer: String,
    },
}

impl RoundDefinition {
    pub fn round_type(&self) -> RoundType {
        match self.content {
            RoundContent::BuzzRace { .. } => RoundType::BuzzRace,
            RoundContent::Writing { .. } => RoundType::Writing,
            RoundContent::Creation { .. } => RoundType::Creation,
            RoundContent::Quiz { .. } => RoundType::Quiz,
        }
    }

    /// The ordered phase sequence this round moves through.
    pub fn phases(&self) -> Vec<PhaseSpec> {
        match &self.content {
            RoundContent::BuzzRace { listen_secs, .. } => vec![
                PhaseSpec {
                    phase: Phase::Listening,
                    duration_secs: Some(*listen_secs),
                },
                PhaseSpec {
                    phase: Phase::Locked,
                    duration_secs: None,
                },
                PhaseSpec {
                    phase: Phase::Ended,
                    duration_secs: None,
                },
            ],
            RoundContent::Writing {
                writing_secs,
                voting_secs,
                ..
            } => vec![
                PhaseSpec {
                    phase: Phase::Writing,
                    duration_secs: Some(*writing_secs),
                },
                PhaseSpec {
                    phase: Phase::Voting,
                    duration_secs: Some(*voting_secs),
                },
                PhaseSpec {
                    phase: Phase::Ended,
                    duration_secs: None,
                },
            ],
            RoundContent::Creation {
                creating_secs,
                voting_secs,
                ..
            } => vec![
                PhaseSpec {
                    phase: Phase::Creating,
                    duration_secs: Some(*creating_secs),
                },
                PhaseSpec {
                    phase: Phase::Voting,
                    duration_secs: Some(*voting_secs),
                },
                PhaseSpec {
                    phase: Phase::Ended,
                    duration_secs: None,
                },
            ],
            RoundContent::Quiz { .. } => vec![
                PhaseSpec {
                    phase: Phase::Showing,
                    duration_secs: None,
                },
                PhaseSpec {
                    phase: Phase::Ended,
                    duration_secs: None,
                },
            ],
        }
    }

    /// The phase during which teams may submit, if this round collects
    /// submissions at all.
    pub fn submission_phase(&self) -> Option<Phase> {
        match self.content {
            RoundContent::Writing { .. } => Some(Phase::Writing),
            RoundContent::Creation { .. } => Some(Phase::Creating),
            _ => None,
        }
    }

    /// Whether winners of this round are decided by the ballot tally.
    pub fn is_vote_round(&self) -> bool {
        matches!(
            self.content,
            RoundContent::Writing { .. } | RoundContent::Creation { .. }
        )
    }
}

/// A team's contribution during a submission phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionPayload {
    Text { text: String },
    /// Reference to an uploaded photo; storage itself is out of scope.
    Photo { url: String },
}

/// One anonymized entry of the frozen ballot. The `index -> owner` mapping is
/// kept in a server-private side table and never serialized into this.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BallotEntry {
    pub index: usize,
    pub payload: SubmissionPayload,
}

/// The live, mutable round. Exactly one is active at a time.
#[derive(Debug, Clone)]
pub struct RoundInstance {
    pub id: RoundId,
    pub definition: RoundDefinition,
    pub phase: Phase,
    /// Set exactly once per phase entry; all remaining-time math is derived
    /// from it plus `phase_duration_secs`, never from client-local counters.
    pub phase_started_at: DateTime<Utc>,
    pub phase_duration_secs: Option<u64>,
    /// Session-wide monotonic counter, bumped on every phase entry. A timer
    /// whose captured generation no longer matches the live phase is stale
    /// and must fire as a no-op.
    pub generation: u64,
    pub submissions: HashMap<TeamId, SubmissionPayload>,
    pub votes: HashMap<TeamId, usize>,
    pub ballot: Option<Vec<BallotEntry>>,
    pub buzz_winner: Option<TeamId>,
    pub winners: Option<Vec<TeamId>>,
}

impl RoundInstance {
    pub fn new(definition: RoundDefinition, generation: u64, started_at: DateTime<Utc>) -> Self {
        let first = definition.phases()[0];
        Self {
            id: ulid::Ulid::new().to_string(),
            phase: first.phase,
            phase_started_at: started_at,
            phase_duration_secs: first.duration_secs,
            generation,
            definition,
            submissions: HashMap::new(),
            votes: HashMap::new(),
            ballot: None,
            buzz_winner: None,
            winners: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Ended
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Team,
    Beamer,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writing_def() -> RoundDefinition {
        RoundDefinition {
            title: "Write something".to_string(),
            points: 2,
            content: RoundContent::Writing {
                prompt: "A haiku about cables".to_string(),
                writing_secs: 90,
                voting_secs: 45,
            },
        }
    }

    #[test]
    fn writing_round_phase_sequence() {
        let phases = writing_def().phases();
        let names: Vec<Phase> = phases.iter().map(|s| s.phase).collect();
        assert_eq!(names, vec![Phase::Writing, Phase::Voting, Phase::Ended]);
        assert_eq!(phases[0].duration_secs, Some(90));
        assert_eq!(phases[2].duration_secs, None);
    }

    #[test]
    fn buzz_round_locked_has_no_timer() {
        let def = RoundDefinition {
            title: "Name that tune".to_string(),
            points: 3,
            content: RoundContent::BuzzRace {
                audio_url: "/media/tune01.mp3".to_string(),
                answer: "Daft Punk".to_string(),
                listen_secs: 30,
            },
        };
        let phases = def.phases();
        assert_eq!(phases[1].phase, Phase::Locked);
        assert_eq!(phases[1].duration_secs, None);
        assert!(!def.is_vote_round());
        assert_eq!(def.submission_phase(), None);
    }

    #[test]
    fn new_instance_enters_first_phase() {
        let instance = RoundInstance::new(writing_def(), 7, chrono::Utc::now());
        assert_eq!(instance.phase, Phase::Writing);
        assert_eq!(instance.phase_duration_secs, Some(90));
        assert_eq!(instance.generation, 7);
        assert!(instance.submissions.is_empty());
        assert!(!instance.is_terminal());
    }

    #[test]
    fn round_definition_json_is_tagged_by_type() {
        let json = serde_json::to_value(writing_def()).unwrap();
        assert_eq!(json["type"], "writing");
        assert_eq!(json["prompt"], "A haiku about cables");
    }
}
