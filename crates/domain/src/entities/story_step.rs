//! Story step entity - one persisted unit of generated narrative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{StoryRunId, StoryStepId};
use crate::value_objects::{Choice, StoryResponse};

/// A persisted story step within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryStep {
    pub id: StoryStepId,
    pub run_id: StoryRunId,
    /// Zero-based position within the run.
    pub index: u32,
    pub story_text: String,
    pub choices: Vec<Choice>,
    /// Id of the choice the player selected, once they have.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_choice_id: Option<String>,
    pub is_ending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_type: Option<String>,
    /// Whether the validator had to repair this step's payload.
    pub repaired: bool,
    pub created_at: DateTime<Utc>,
}

impl StoryStep {
    /// Build a step from an accepted response.
    pub fn from_response(
        run_id: StoryRunId,
        index: u32,
        response: &StoryResponse,
        repaired: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StoryStepId::new(),
            run_id,
            index,
            story_text: response.story_text.clone(),
            choices: response.choices.clone(),
            chosen_choice_id: None,
            is_ending: response.is_ending,
            ending_type: response.ending_type.clone(),
            repaired,
            created_at: now,
        }
    }

    /// Look up a choice offered by this step.
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}
