extern crate self as storyforge_domain;

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

// Re-export entities
pub use entities::{StoryRun, StoryStep, UserProfile};

pub use error::DomainError;

// Re-export ID types
pub use ids::{SessionId, StoryRunId, StoryStepId, UserId};

// Re-export value objects (explicit list in value_objects/mod.rs)
pub use value_objects::{
    AccessTier, ChallengeLevel, Choice, GameState, GenerationRequest, Genre, PersonalityTraits,
    RateLimitRecord, Requester, StoryLength, StoryResponse, SubscriptionTier, CHOICES_MAX,
    CHOICES_MIN, CHOICE_ID_MAX_LEN, CHOICE_SLUG_MAX_LEN, CHOICE_TEXT_MAX_LEN, STORY_TEXT_MAX_LEN,
    TRAIT_MAX, TRAIT_MIN, TRAIT_NEUTRAL,
};
