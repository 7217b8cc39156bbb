//! Use cases - user story orchestration.
//!
//! Each module contains use cases for a specific domain area. Use cases
//! orchestrate ports and domain types to fulfill user stories.

pub mod gate;
pub mod generation;
pub mod story;

// Re-export main types
pub use gate::{AccessDecision, DenialReason, FeatureGate, RateLimitDecision, RateLimiter};
pub use generation::{
    validate_story_response, validate_with_retry, GenerationError, RetryConfig, RetryOutcome,
    StepGenerator, ValidationResult,
};
pub use story::StoryUseCases;
