//! Story response value object - one validated unit of generated content.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{Choice, GameState};

/// Maximum length of the narrative text in one step.
pub const STORY_TEXT_MAX_LEN: usize = 5000;
/// Minimum number of choices a non-terminal response must offer.
pub const CHOICES_MIN: usize = 2;
/// Maximum number of choices a response may offer.
pub const CHOICES_MAX: usize = 4;

/// A candidate story step as produced by the model and accepted by the
/// validator.
///
/// Transient: produced per generation call, persisted as a `StoryStep` or
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub story_text: String,
    pub choices: Vec<Choice>,
    pub game_state: GameState,
    pub is_ending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_type: Option<String>,
}

impl StoryResponse {
    /// Check the structural invariants on an already-constructed response.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.story_text.is_empty() || self.story_text.len() > STORY_TEXT_MAX_LEN {
            return Err(DomainError::validation(format!(
                "story text must be 1-{} characters",
                STORY_TEXT_MAX_LEN
            )));
        }
        if self.choices.len() < CHOICES_MIN || self.choices.len() > CHOICES_MAX {
            return Err(DomainError::validation(format!(
                "a response must offer {}-{} choices",
                CHOICES_MIN, CHOICES_MAX
            )));
        }
        for choice in &self.choices {
            choice.validate()?;
        }
        self.game_state.validate()
    }
}
