//! Story run aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::StoryRunId;
use crate::value_objects::{
    ChallengeLevel, GameState, Genre, Requester, StoryLength, StoryResponse,
};

/// One playthrough of a generated story.
///
/// Owns the game state; the state is mutated only by applying a validated
/// generation result through [`StoryRun::apply_response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRun {
    pub id: StoryRunId,
    pub requester: Requester,
    pub genre: Genre,
    pub length: StoryLength,
    pub challenge: ChallengeLevel,
    pub game_state: GameState,
    /// Number of steps generated so far.
    pub step_count: u32,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoryRun {
    pub fn new(
        requester: Requester,
        genre: Genre,
        length: StoryLength,
        challenge: ChallengeLevel,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StoryRunId::new(),
            requester,
            genre,
            length,
            challenge,
            game_state: GameState::initial(),
            step_count: 0,
            completed: false,
            ending_type: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a validated response into the run.
    ///
    /// Merges the game state (flags stay append-only), advances the step
    /// counter, and completes the run when the response marks an ending.
    pub fn apply_response(
        &mut self,
        response: &StoryResponse,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.completed {
            return Err(DomainError::constraint(
                "cannot apply a step to a completed run",
            ));
        }
        response.validate()?;

        self.game_state.merge_from(response.game_state.clone());
        self.step_count += 1;
        if response.is_ending {
            self.completed = true;
            self.ending_type = response.ending_type.clone();
        }
        self.updated_at = now;
        Ok(())
    }

    /// Apply the trait impacts of the choice the player selected.
    pub fn apply_choice_impacts(&mut self, impacts: &std::collections::BTreeMap<String, i32>) {
        for (axis, delta) in impacts {
            self.game_state.personality_traits.apply_impact(axis, *delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Choice;

    fn sample_run() -> StoryRun {
        StoryRun::new(
            Requester::guest("s-1"),
            Genre::Fantasy,
            StoryLength::Quick,
            ChallengeLevel::Casual,
            Utc::now(),
        )
    }

    fn sample_response(is_ending: bool) -> StoryResponse {
        StoryResponse {
            story_text: "You reach a fork in the road.".to_string(),
            choices: vec![
                Choice::new("A", "Go left", "go_left"),
                Choice::new("B", "Go right", "go_right"),
            ],
            game_state: GameState::initial(),
            is_ending,
            ending_type: is_ending.then(|| "triumphant".to_string()),
        }
    }

    #[test]
    fn test_apply_response_advances_step_count() {
        let mut run = sample_run();
        run.apply_response(&sample_response(false), Utc::now())
            .expect("apply");
        assert_eq!(run.step_count, 1);
        assert!(!run.completed);
    }

    #[test]
    fn test_apply_ending_completes_run() {
        let mut run = sample_run();
        run.apply_response(&sample_response(true), Utc::now())
            .expect("apply");
        assert!(run.completed);
        assert_eq!(run.ending_type.as_deref(), Some("triumphant"));
    }

    #[test]
    fn test_apply_to_completed_run_is_rejected() {
        let mut run = sample_run();
        run.apply_response(&sample_response(true), Utc::now())
            .expect("apply");
        let err = run
            .apply_response(&sample_response(false), Utc::now())
            .expect_err("must reject");
        assert!(matches!(err, DomainError::Constraint(_)));
    }

    #[test]
    fn test_flags_survive_state_merge() {
        let mut run = sample_run();
        run.game_state.add_flag("heard_the_rumor");

        let mut response = sample_response(false);
        response.game_state.add_flag("found_the_fork");
        run.apply_response(&response, Utc::now()).expect("apply");

        assert_eq!(
            run.game_state.flags,
            vec!["heard_the_rumor", "found_the_fork"]
        );
    }

    #[test]
    fn test_apply_choice_impacts_clamps() {
        let mut run = sample_run();
        let mut impacts = std::collections::BTreeMap::new();
        impacts.insert("riskTaking".to_string(), 80);
        run.apply_choice_impacts(&impacts);
        assert_eq!(run.game_state.personality_traits.risk_taking, 100);
    }
}
