//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete
//! types. Ports exist for:
//! - Database access (could swap SQLite -> Postgres)
//! - Story generation (could swap Ollama -> Claude/OpenAI)
//! - Rate-limit counters (could swap in-process -> Redis)
//! - Clock (for testing)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use storyforge_domain::{
    RateLimitRecord, StoryRun, StoryRunId, StoryStep, StoryStepId, UserId, UserProfile,
};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    pub fn database(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Database(format!("{}: {}", context, err))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("Generation request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Database Ports (one per entity type)
// =============================================================================

#[async_trait]
pub trait StoryRunRepo: Send + Sync {
    async fn get(&self, id: StoryRunId) -> Result<Option<StoryRun>, RepoError>;
    async fn save(&self, run: &StoryRun) -> Result<(), RepoError>;
    async fn delete(&self, id: StoryRunId) -> Result<(), RepoError>;
    async fn list_for_identity(&self, identity: &str) -> Result<Vec<StoryRun>, RepoError>;
}

#[async_trait]
pub trait StoryStepRepo: Send + Sync {
    async fn get(&self, id: StoryStepId) -> Result<Option<StoryStep>, RepoError>;
    async fn save(&self, step: &StoryStep) -> Result<(), RepoError>;
    async fn list_for_run(&self, run_id: StoryRunId) -> Result<Vec<StoryStep>, RepoError>;
    async fn latest_for_run(&self, run_id: StoryRunId) -> Result<Option<StoryStep>, RepoError>;
    /// Record which choice the player selected on a step.
    async fn set_chosen_choice(
        &self,
        id: StoryStepId,
        choice_id: &str,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait UserProfileRepo: Send + Sync {
    async fn get(&self, id: &UserId) -> Result<Option<UserProfile>, RepoError>;
    async fn save(&self, profile: &UserProfile) -> Result<(), RepoError>;
}

// =============================================================================
// Rate-Limit Store Port
// =============================================================================

/// Outcome of an atomic conditional increment on a daily counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCheck {
    /// Whether the increment was applied (count stayed within the limit).
    pub allowed: bool,
    /// The counter value after the call (unchanged when denied).
    pub count: u32,
}

/// Per-identity per-UTC-day request counters.
///
/// `try_increment` is a single conditional increment: the counter is created
/// at 1 on the first request of the day, bumped while strictly below `limit`,
/// and left untouched (denied) once the limit is reached. Implementations
/// must make the check-and-bump atomic - two concurrent callers on the same
/// identity must never both be allowed past the limit.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn try_increment(
        &self,
        identity: &str,
        date: NaiveDate,
        is_guest: bool,
        limit: u32,
    ) -> Result<QuotaCheck, RepoError>;

    /// Read the current record without consuming quota.
    async fn get(
        &self,
        identity: &str,
        date: NaiveDate,
    ) -> Result<Option<RateLimitRecord>, RepoError>;
}

// =============================================================================
// Story Producer Port
// =============================================================================

/// Prompt handed to the content producer for one generation attempt.
#[derive(Debug, Clone)]
pub struct StoryPrompt {
    /// System prompt: genre/length/challenge framing and the output contract.
    pub system: String,
    /// User prompt: current run state and the selected choice, if any.
    pub user: String,
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl StoryPrompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Produces one candidate story response as an untyped JSON value.
///
/// The payload is deliberately untyped: validation and repair live in the
/// generation use cases, not in the adapter.
#[async_trait]
pub trait StoryProducerPort: Send + Sync {
    async fn produce(&self, prompt: &StoryPrompt) -> Result<serde_json::Value, ProducerError>;
}

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
