//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::ports::{
    ClockPort, RateLimitStore, StoryProducerPort, StoryRunRepo, StoryStepRepo, UserProfileRepo,
};
use crate::use_cases::gate::{FeatureGate, RateLimiter};
use crate::use_cases::generation::{RetryConfig, StepGenerator};
use crate::use_cases::story::StoryUseCases;

/// Container for all repository ports.
pub struct Repositories {
    pub runs: Arc<dyn StoryRunRepo>,
    pub steps: Arc<dyn StoryStepRepo>,
    pub profiles: Arc<dyn UserProfileRepo>,
    pub rate_limits: Arc<dyn RateLimitStore>,
}

/// Container for all use cases.
pub struct UseCases {
    pub story: StoryUseCases,
}

/// Main application state.
///
/// Holds all repositories and use cases. Passed to HTTP handlers via Axum
/// state.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
    pub clock: Arc<dyn ClockPort>,
}

impl App {
    pub fn new(
        repositories: Repositories,
        producer: Arc<dyn StoryProducerPort>,
        clock: Arc<dyn ClockPort>,
        retry: RetryConfig,
    ) -> Self {
        let gate = Arc::new(FeatureGate::new(
            repositories.profiles.clone(),
            clock.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(
            repositories.rate_limits.clone(),
            clock.clone(),
        ));
        let generator = Arc::new(StepGenerator::new(producer, retry));

        let story = StoryUseCases::new(
            repositories.runs.clone(),
            repositories.steps.clone(),
            gate,
            limiter,
            generator,
            clock.clone(),
        );

        Self {
            repositories,
            use_cases: UseCases { story },
            clock,
        }
    }
}
