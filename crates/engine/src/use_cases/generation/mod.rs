//! Generation pipeline: validation, repair, and bounded retry.

pub mod generate_step;
pub mod prompts;
pub mod repair;
pub mod retry;
pub mod validator;


pub use generate_step::{GeneratedStep, StepGenerator};
pub use repair::{repair_choice, repair_game_state};
pub use retry::{validate_with_retry, AttemptRecord, RetryConfig, RetryOutcome};
pub use validator::{is_retryable, validate_story_response, ValidationResult};

use crate::infrastructure::ports::RepoError;
use crate::use_cases::gate::{DenialReason, RateLimitDecision};
use storyforge_domain::DomainError;

/// Failures a generation request can surface to its caller.
///
/// Quota and feature denials short-circuit before any producer call;
/// exhaustion carries the last attempt's errors and whether trying again
/// later is sensible.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Daily story limit reached")]
    QuotaExceeded { decision: RateLimitDecision },

    #[error("Premium subscription required: {}", reason.code())]
    FeatureDenied { reason: DenialReason },

    #[error("Story generation failed after {attempts} attempt(s)")]
    ProducerExhausted {
        attempts: u32,
        errors: Vec<String>,
        can_retry: bool,
    },

    #[error("Story run not found")]
    RunNotFound,

    #[error("Story run is already completed")]
    RunCompleted,

    #[error("Unknown choice: {0}")]
    UnknownChoice(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
