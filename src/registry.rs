//! Round Registry: the ordered collection of round templates.
//!
//! A pure lookup table with no mutable state; the only failure mode is asking
//! for a type that has no template.

use crate::error::GameError;
use crate::types::{RoundContent, RoundDefinition, RoundType};

#[derive(Debug, Clone)]
pub struct RoundRegistry {
    definitions: Vec<RoundDefinition>,
}

impl RoundRegistry {
    pub fn new(definitions: Vec<RoundDefinition>) -> Self {
        Self { definitions }
    }

    /// The default session line-up, one template per round type.
    pub fn builtin() -> Self {
        Self::new(vec![
            RoundDefinition {
                title: "Buzz: name that tune".to_string(),
                points: 3,
                content: RoundContent::BuzzRace {
                    audio_url: "/media/round-buzz.mp3".to_string(),
                    answer: "Never Gonna Give You Up".to_string(),
                    listen_secs: 30,
                },
            },
            RoundDefinition {
                title: "Finish the slogan".to_string(),
                points: 2,
                content: RoundContent::Writing {
                    prompt: "Write the worst possible tagline for a dating app".to_string(),
                    writing_secs: 90,
                    voting_secs: 45,
                },
            },
            RoundDefinition {
                title: "Photo challenge".to_string(),
                points: 2,
                content: RoundContent::Creation {
                    prompt: "Recreate a famous album cover with what's on your table".to_string(),
                    creating_secs: 180,
                    voting_secs: 45,
                },
            },
            RoundDefinition {
                title: "Pub quiz".to_string(),
                points: 1,
                content: RoundContent::Quiz {
                    question: "Which planet has the shortest day?".to_string(),
                    answer: "Jupiter".to_string(),
                },
            },
        ])
    }

    pub fn get(&self, round_type: RoundType) -> Result<&RoundDefinition, GameError> {
        self.definitions
            .iter()
            .find(|d| d.round_type() == round_type)
            .ok_or(GameError::UnknownRoundType(round_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_round_type() {
        let registry = RoundRegistry::builtin();
        for round_type in [
            RoundType::BuzzRace,
            RoundType::Writing,
            RoundType::Creation,
            RoundType::Quiz,
        ] {
            assert!(registry.get(round_type).is_ok(), "{round_type:?} missing");
        }
    }

    #[test]
    fn unknown_type_is_reported() {
        let registry = RoundRegistry::new(vec![]);
        assert_eq!(
            registry.get(RoundType::Quiz),
            Err(GameError::UnknownRoundType(RoundType::Quiz))
        );
    }
}
