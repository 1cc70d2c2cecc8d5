use super::AppState;
use crate::error::GameError;
use crate::types::*;

impl AppState {
    /// Register a new team. Names are unique case-insensitively for the
    /// whole session.
    pub async fn join_team(&self, name: &str) -> Result<Team, GameError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(GameError::EmptyTeamName);
        }

        let mut session = self.session.write().await;
        let wanted = trimmed.to_lowercase();
        if session
            .teams
            .values()
            .any(|t| t.name.to_lowercase() == wanted)
        {
            return Err(GameError::NameTaken(trimmed.to_string()));
        }

        let team = Team {
            id: ulid::Ulid::new().to_string(),
            name: trimmed.to_string(),
            points: 0,
        };
        session.teams.insert(team.id.clone(), team.clone());
        drop(session);

        tracing::info!(team = %team.name, "team joined");
        self.broadcast_state().await;
        Ok(team)
    }

    pub async fn get_team(&self, team_id: &str) -> Option<Team> {
        self.session.read().await.teams.get(team_id).cloned()
    }

    /// Admin point award, used for buzz and quiz rounds where winners are
    /// not decided by a tally.
    pub async fn award_points(&self, team_id: &str, points: u32) -> Result<Team, GameError> {
        let mut session = self.session.write().await;
        let team = session
            .teams
            .get_mut(team_id)
            .ok_or_else(|| GameError::UnknownTeam(team_id.to_string()))?;
        team.points += points;
        let team = team.clone();
        drop(session);

        self.broadcast_state().await;
        Ok(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_team() {
        let state = AppState::new();
        let team = state.join_team("  The Quizzards ").await.unwrap();

        assert_eq!(team.name, "The Quizzards");
        assert_eq!(team.points, 0);
        assert!(state.get_team(&team.id).await.is_some());
    }

    #[tokio::test]
    async fn test_join_team_name_unique_case_insensitive() {
        let state = AppState::new();
        state.join_team("Team Rocket").await.unwrap();

        let result = state.join_team("team rocket").await;
        assert_eq!(result, Err(GameError::NameTaken("team rocket".to_string())));
    }

    #[tokio::test]
    async fn test_join_team_rejects_empty_name() {
        let state = AppState::new();
        assert_eq!(state.join_team("   ").await, Err(GameError::EmptyTeamName));
    }

    #[tokio::test]
    async fn test_award_points_accumulates() {
        let state = AppState::new();
        let team = state.join_team("Alpha").await.unwrap();

        state.award_points(&team.id, 3).await.unwrap();
        let team = state.award_points(&team.id, 2).await.unwrap();
        assert_eq!(team.points, 5);
    }

    #[tokio::test]
    async fn test_award_points_unknown_team() {
        let state = AppState::new();
        let result = state.award_points("nope", 1).await;
        assert_eq!(result, Err(GameError::UnknownTeam("nope".to_string())));
    }
}
